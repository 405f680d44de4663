// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module contains the configuration options for building a `Topology`.

/// Configuration options for building a `Topology`.
#[derive(Clone, Default, Debug)]
pub struct TopologyConfig {
    /// Whether to fail when a grid load that is referenced by a grid
    /// connection point ends up without a primary occupant.  When this is
    /// `false`, such grid loads are only logged.
    pub reject_unoccupied_grid_loads: bool,

    /// Whether to stop controllers from tracking the vehicles of the group
    /// they are wired with.  By default, every controller tracks all vehicles
    /// of its group, even those it has no attribute mapping with, because
    /// vehicles only reach the grid through their charging station.
    pub skip_vehicle_tracking: bool,

    /// Whether to skip the final dataflow validation of the built topology.
    pub skip_dataflow_validation: bool,
}
