// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for building [`Topology`] instances from created entities and
//! their configuration.

use petgraph::graph::NodeIndex;

use crate::{
    AttrLink, ConnectionMatrix, ConnectionPlanner, Entity, EntityCollection, Error,
    ForecastBinder, GcpConfig, GridComponents, GridTopologyBinder, ModelRegistry, TopologyConfig,
};

use super::{Link, Strength, Topology};

/// Builds a [`Topology`] stage by stage.
///
/// Each stage adds links to the topology under construction.  Nothing is
/// handed to the co-simulation engine until the built topology is committed.
/// Once a stage has failed, later stages and [`build`][Self::build] return
/// the same error, so a partially wired topology is never returned.
pub struct TopologyBuilder<'a> {
    registry: &'a ModelRegistry,
    matrix: &'a ConnectionMatrix,
    config: TopologyConfig,
    topology: Topology,
    failed: Option<Error>,
}

impl<'a> TopologyBuilder<'a> {
    /// Creates a new builder for the given registry and connection matrix.
    pub fn new(
        registry: &'a ModelRegistry,
        matrix: &'a ConnectionMatrix,
        config: TopologyConfig,
    ) -> Self {
        Self {
            registry,
            matrix,
            config,
            topology: Topology::default(),
            failed: None,
        }
    }

    /// Returns the error of an earlier failed stage, if any.
    fn check_failed(&self) -> Result<(), Error> {
        match &self.failed {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Records the outcome of a stage.
    fn finish_stage(&mut self, result: Result<(), Error>) -> Result<&mut Self, Error> {
        if let Err(err) = result {
            self.failed = Some(err.clone());
            return Err(err);
        }
        Ok(self)
    }

    /// Connects all entity types of the given collection with each other.
    pub fn connect_entities(&mut self, entities: &EntityCollection) -> Result<&mut Self, Error> {
        self.check_failed()?;
        let result = ConnectionPlanner::new(self.registry, self.matrix, &self.config)
            .connect_groups(&mut self.topology, entities);
        self.finish_stage(result)
    }

    /// Connects the entities to the grid loads they are attached to, and the
    /// entities behind each grid connection point with each other.
    pub fn connect_grid(
        &mut self,
        grid: &GridComponents,
        gcps: &GcpConfig,
        entities: &EntityCollection,
    ) -> Result<&mut Self, Error> {
        self.check_failed()?;
        let planner = ConnectionPlanner::new(self.registry, self.matrix, &self.config);
        let result =
            GridTopologyBinder::new(&planner).bind(&mut self.topology, grid, gcps, entities);
        self.finish_stage(result)
    }

    /// Connects the entities to the given forecast provider.
    pub fn connect_forecast(
        &mut self,
        forecast: &Entity,
        entities: &EntityCollection,
    ) -> Result<&mut Self, Error> {
        self.check_failed()?;
        let result =
            ForecastBinder::new(self.registry).bind(&mut self.topology, forecast, entities);
        self.finish_stage(result)
    }

    /// Validates and returns the built topology.
    pub fn build(self) -> Result<Topology, Error> {
        self.check_failed()?;
        if !self.config.skip_dataflow_validation {
            self.topology.validate()?;
        }
        Ok(self.topology)
    }
}

/// `Topology` construction primitives.
impl Topology {
    /// Adds the given entity to the graph, unless an entity with the same
    /// `full_id` is already present, and returns its index.
    pub(crate) fn add_entity(&mut self, entity: &Entity) -> NodeIndex {
        if let Some(idx) = self.node_indices.get(entity.full_id()) {
            return *idx;
        }
        let idx = self.graph.add_node(entity.clone());
        self.node_indices.insert(entity.full_id().to_string(), idx);
        idx
    }

    /// Adds a link from `source` to `destination`.
    ///
    /// If the two entities are already linked in the same direction, the
    /// attributes and initial data are merged into the existing link, so
    /// adding the same link twice has no effect.
    pub(crate) fn add_link(
        &mut self,
        source: &Entity,
        destination: &Entity,
        attributes: &[AttrLink],
        strength: Strength,
    ) -> Result<(), Error> {
        let sid = source.full_id();
        let did = destination.full_id();

        if sid == did {
            return Err(Error::invalid_topology(format!(
                "Link:({sid}, {did}) Can't connect an entity to itself."
            )));
        }
        if attributes.is_empty() {
            return Err(Error::internal(format!(
                "Link:({sid}, {did}) Can't create a link without attributes."
            )));
        }

        let source_idx = self.add_entity(source);
        let dest_idx = self.add_entity(destination);

        match self.links.get_mut(&(source_idx, dest_idx)) {
            Some(link) => {
                match (&mut link.strength, strength) {
                    (Strength::Strong, Strength::Strong) => {}
                    (Strength::Weak(existing), Strength::Weak(data)) => existing.merge(data),
                    (existing, requested) => {
                        return Err(Error::conflicting_link(format!(
                            "Link:({sid}, {did}) is {existing} and can't become {requested}."
                        )));
                    }
                }
                for attribute in attributes {
                    if !link.attributes.contains(attribute) {
                        link.attributes.push(attribute.clone());
                    }
                }
            }
            None => {
                self.links.insert(
                    (source_idx, dest_idx),
                    Link {
                        source: sid.to_string(),
                        destination: did.to_string(),
                        attributes: attributes.to_vec(),
                        strength,
                    },
                );
                self.graph.update_edge(source_idx, dest_idx, ());
            }
        }

        Ok(())
    }

    /// Adds `subordinate` to the controlled entities of `controller`.
    pub(crate) fn register_controlled(&mut self, controller: &Entity, subordinate: &Entity) {
        self.add_entity(controller);
        self.controlled
            .entry(controller.full_id().to_string())
            .or_default()
            .insert(subordinate.eid().to_string(), subordinate.descriptor());
    }

    /// Adds `subject` to the entities `forecast` computes forecasts for.
    pub(crate) fn register_forecast_subject(&mut self, forecast: &Entity, subject: &Entity) {
        self.add_entity(forecast);
        self.forecast_subjects
            .entry(forecast.full_id().to_string())
            .or_default()
            .insert(subject.full_id().to_string(), subject.descriptor());
    }
}
