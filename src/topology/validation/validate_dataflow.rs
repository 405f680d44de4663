// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for validating that the dataflow of a [`Topology`] can be
//! resolved step by step.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;

use crate::{Error, Strength};

use super::TopologyValidator;

impl TopologyValidator<'_> {
    /// Validates that every weak link is the delayed half of a feedback loop,
    /// i.e. that there is a strong link in the opposite direction.
    pub(super) fn validate_weak_links(&self) -> Result<(), Error> {
        for ((source, destination), link) in &self.topology.links {
            if !link.strength().is_weak() {
                continue;
            }
            let reverse = self.topology.links.get(&(*destination, *source));
            if !reverse.is_some_and(|l| !l.strength().is_weak()) {
                return Err(Error::invalid_topology(format!(
                    "Weak link {} -> {} has no strong link in the opposite direction.",
                    link.source(),
                    link.destination()
                )));
            }
        }
        Ok(())
    }

    /// Validates that the strong links don't form a cycle, which would make
    /// entities depend on their own output within the same step.
    ///
    /// If a cycle is detected, an error is returned, that lists the entities
    /// in the cycle.
    pub(super) fn validate_same_step_acyclicity(&self) -> Result<(), Error> {
        let mut done = HashSet::new();
        for index in self.topology.graph.node_indices() {
            if !done.contains(&index) {
                self.visit(index, &mut vec![], &mut done)?;
            }
        }
        Ok(())
    }

    fn visit(
        &self,
        index: NodeIndex,
        path: &mut Vec<NodeIndex>,
        done: &mut HashSet<NodeIndex>,
    ) -> Result<(), Error> {
        path.push(index);
        for successor in self.strong_successors(index) {
            if let Some(first_occurance) = path.iter().position(|i| *i == successor) {
                return Err(Error::invalid_topology(format!(
                    "Cycle detected: {} -> {}",
                    path[first_occurance..]
                        .iter()
                        .map(|i| self.topology.graph[*i].full_id())
                        .collect::<Vec<_>>()
                        .join(" -> "),
                    self.topology.graph[successor].full_id()
                )));
            }
            if !done.contains(&successor) {
                self.visit(successor, path, done)?;
            }
        }
        path.pop();
        done.insert(index);
        Ok(())
    }

    fn strong_successors(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut successors = self
            .topology
            .graph
            .neighbors_directed(index, petgraph::Direction::Outgoing)
            .filter(|successor| {
                self.topology
                    .links
                    .get(&(index, *successor))
                    .is_some_and(|l| *l.strength() == Strength::Strong)
            })
            .collect::<Vec<_>>();
        // petgraph yields the most recently added neighbor first.
        successors.reverse();
        successors
    }
}
