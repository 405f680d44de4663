// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for retrieving entities, links and registries from a [`Topology`].

use petgraph::graph::NodeIndex;

use crate::iterators::{Entities, Links, Neighbors};
use crate::{ControlledEntitySet, Entity, Error, ForecastSubjects, Link, Topology};

/// `Entity` and `Link` retrieval.
impl Topology {
    /// Returns the entity with the given `full_id`, if it is part of the
    /// topology.
    pub fn entity(&self, full_id: &str) -> Result<&Entity, Error> {
        self.index_of(full_id).map(|i| &self.graph[i])
    }

    /// Returns an iterator over the entities in the topology.
    pub fn entities(&self) -> Entities<'_> {
        Entities {
            iter: self.graph.raw_nodes().iter(),
        }
    }

    /// Returns an iterator over the links in the topology.
    pub fn links(&self) -> Links<'_> {
        Links {
            iter: self.links.values(),
        }
    }

    /// Returns the link from `source` to `destination`, if there is one.
    pub fn link(&self, source: &str, destination: &str) -> Option<&Link> {
        let source_idx = self.node_indices.get(source)?;
        let dest_idx = self.node_indices.get(destination)?;
        self.links.get(&(*source_idx, *dest_idx))
    }

    /// Returns an iterator over the entities the entity with the given
    /// `full_id` reads from.
    ///
    /// Returns an error if the given `full_id` does not exist.
    pub fn predecessors(&self, full_id: &str) -> Result<Neighbors<'_>, Error> {
        self.index_of(full_id).map(|index| Neighbors {
            graph: &self.graph,
            iter: self
                .graph
                .neighbors_directed(index, petgraph::Direction::Incoming),
        })
    }

    /// Returns an iterator over the entities that read from the entity with
    /// the given `full_id`.
    ///
    /// Returns an error if the given `full_id` does not exist.
    pub fn successors(&self, full_id: &str) -> Result<Neighbors<'_>, Error> {
        self.index_of(full_id).map(|index| Neighbors {
            graph: &self.graph,
            iter: self
                .graph
                .neighbors_directed(index, petgraph::Direction::Outgoing),
        })
    }

    /// Returns the entities the controller with the given `full_id` controls.
    pub fn controlled_entities(&self, controller: &str) -> Option<&ControlledEntitySet> {
        self.controlled.get(controller)
    }

    /// Returns an iterator over the controllers and the entities they control.
    pub fn controllers(&self) -> impl Iterator<Item = (&str, &ControlledEntitySet)> {
        self.controlled
            .iter()
            .map(|(full_id, set)| (full_id.as_str(), set))
    }

    /// Returns the entities the forecast provider with the given `full_id`
    /// computes forecasts for.
    pub fn forecast_subjects(&self, forecast: &str) -> Option<&ForecastSubjects> {
        self.forecast_subjects.get(forecast)
    }

    pub(crate) fn index_of(&self, full_id: &str) -> Result<NodeIndex, Error> {
        self.node_indices.get(full_id).copied().ok_or_else(|| {
            Error::unknown_entity_reference(format!("Entity with id {full_id} not found."))
        })
    }
}
