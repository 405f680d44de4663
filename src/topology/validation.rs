// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for validating a [`Topology`].

mod validate_dataflow;

use crate::{Error, Topology};

pub(crate) struct TopologyValidator<'a> {
    topology: &'a Topology,
}

/// Validation of a built topology.
impl Topology {
    /// Validates that the topology can be stepped through:
    ///  - every weak link has a strong link in the opposite direction,
    ///  - the strong links don't form a cycle.
    pub fn validate(&self) -> Result<(), Error> {
        let validator = TopologyValidator { topology: self };

        validator.validate_weak_links()?;
        validator.validate_same_step_acyclicity()?;

        Ok(())
    }
}
