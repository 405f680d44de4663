// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module is only compiled when running unit tests and contains features
//! that are shared by all tests of the crate.
//!
//! - the `MockWorld` and `MockSimulator` types, which implement the `World`
//!   and `Simulator` traits respectively and record what they are asked to do.
//! - the `ScenarioBuilder`, which can declaratively set up the entities and
//!   the connection matrix of a scenario for use in tests.

use indexmap::IndexMap;
use serde_json::Value;

use crate::{
    planner::attribute_names, AttrLink, ConnectionMatrix, ControlledEntitySet, ControllerKind,
    DeviceKind, Entity, EntityCollection, Error, GcpConfig, GridComponents, ModelRegistry,
    ModelRole, Simulator, Simulators, Strength, Topology, TopologyBuilder, TopologyConfig, World,
};

/// A link the `MockWorld` was asked to create.
pub(crate) struct Connection {
    pub(crate) source: String,
    pub(crate) destination: String,
    pub(crate) attributes: Vec<AttrLink>,
    pub(crate) names: String,
    pub(crate) strength: Strength,
}

#[derive(Default)]
pub(crate) struct MockWorld {
    pub(crate) recorded: Vec<Connection>,
}

impl MockWorld {
    /// Returns `(source, destination, attributes, is_weak)` for every recorded
    /// link.
    pub(crate) fn connections(&self) -> Vec<(&str, &str, &str, bool)> {
        self.recorded
            .iter()
            .map(|c| {
                (
                    c.source.as_str(),
                    c.destination.as_str(),
                    c.names.as_str(),
                    c.strength.is_weak(),
                )
            })
            .collect()
    }

    /// Returns the initial data of the weak link from `source` to
    /// `destination`.
    pub(crate) fn initial_data(&self, source: &str, destination: &str) -> Option<Value> {
        self.recorded
            .iter()
            .find(|c| c.source == source && c.destination == destination)
            .and_then(|c| c.strength.initial_data())
            .map(|data| data.to_json())
    }
}

impl World for MockWorld {
    fn connect(
        &mut self,
        source: &Entity,
        destination: &Entity,
        attributes: &[AttrLink],
        strength: &Strength,
    ) {
        self.recorded.push(Connection {
            source: source.full_id().to_string(),
            destination: destination.full_id().to_string(),
            attributes: attributes.to_vec(),
            names: attribute_names(attributes),
            strength: strength.clone(),
        });
    }
}

pub(crate) struct MockSimulator {
    pub(crate) name: String,
    pub(crate) models: Vec<String>,
    pub(crate) entities: Vec<Entity>,
    pub(crate) init_vals: IndexMap<String, Vec<Value>>,
    pub(crate) controlled: IndexMap<String, ControlledEntitySet>,
    pub(crate) forecasted: IndexMap<String, IndexMap<String, Entity>>,
    /// Number of entities `create` leaves out, to simulate a faulty simulator.
    pub(crate) short_by: usize,
}

impl MockSimulator {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            models: vec![],
            entities: vec![],
            init_vals: IndexMap::new(),
            controlled: IndexMap::new(),
            forecasted: IndexMap::new(),
            short_by: 0,
        }
    }
}

impl Simulator for MockSimulator {
    fn has_model(&self, model_type: &str) -> bool {
        self.models.iter().any(|m| m == model_type)
    }

    fn create(&mut self, model_type: &str, num: usize, init_vals: &[Value]) -> Vec<Entity> {
        let existing = self
            .entities
            .iter()
            .filter(|e| e.model_type() == model_type)
            .count();
        let created = (existing..existing + num.saturating_sub(self.short_by))
            .map(|n| {
                let eid = format!("{model_type}_{n}");
                Entity::new(eid.clone(), format!("{}-0.{eid}", self.name), model_type)
            })
            .collect::<Vec<_>>();

        self.entities.extend(created.iter().cloned());
        self.init_vals
            .entry(model_type.to_string())
            .or_default()
            .extend(init_vals.iter().cloned());
        created
    }

    fn get_entity_by_id(&self, eid: &str) -> Option<Entity> {
        self.entities.iter().find(|e| e.eid() == eid).cloned()
    }

    fn add_controlled_entity(&mut self, controller_eid: &str, entities: &ControlledEntitySet) {
        self.controlled
            .entry(controller_eid.to_string())
            .or_default()
            .extend(entities.clone());
    }

    fn add_forecasted_entity(&mut self, forecast_eid: &str, subjects: &IndexMap<String, Entity>) {
        self.forecasted
            .entry(forecast_eid.to_string())
            .or_default()
            .extend(subjects.clone());
    }
}

/// Returns a registry with the model types used by the tests.
pub(crate) fn scenario_registry() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    for (simulator, model_type, role) in [
        ("PVSim", "pv", ModelRole::Device(DeviceKind::Generic)),
        ("BatSim", "battery", ModelRole::Device(DeviceKind::Generic)),
        (
            "CSSim",
            "charging_station",
            ModelRole::Device(DeviceKind::ChargingStation),
        ),
        ("EVSim", "car", ModelRole::Device(DeviceKind::Vehicle)),
        (
            "EMSSim",
            "HEMS_default",
            ModelRole::Controller(ControllerKind::Local),
        ),
        ("EMSSim", "GridEMS", ModelRole::Controller(ControllerKind::Grid)),
        ("ForecastSim", "Forecast", ModelRole::Forecast),
        ("Grid", "Grid", ModelRole::GridElement),
        ("Grid", "load", ModelRole::GridElement),
    ] {
        registry
            .register(simulator, model_type, role)
            .expect("test model types are unique");
    }
    registry
}

/// A builder for the entities and the connection matrix of test scenarios.
pub(crate) struct ScenarioBuilder {
    registry: ModelRegistry,
    matrix: ConnectionMatrix,
    config: TopologyConfig,
    entities: EntityCollection,
    /// Every entity with the name of its simulator, including the ones that
    /// aren't part of `entities`.
    created: Vec<(String, Entity)>,
}

impl ScenarioBuilder {
    pub(crate) fn new() -> Self {
        Self {
            registry: scenario_registry(),
            matrix: ConnectionMatrix::new(),
            config: TopologyConfig::default(),
            entities: EntityCollection::new(),
            created: vec![],
        }
    }

    fn make(simulator: &str, model_type: &str, eid: &str) -> Entity {
        Entity::new(eid, format!("{simulator}-0.{eid}"), model_type)
    }

    /// Adds an entity to the scenario.
    pub(crate) fn entity(&mut self, simulator: &str, model_type: &str, eid: &str) -> Entity {
        let entity = Self::make(simulator, model_type, eid);
        self.entities
            .entry(model_type.to_string())
            .or_default()
            .push(entity.clone());
        self.created.push((simulator.to_string(), entity.clone()));
        entity
    }

    /// Adds an empty group for `model_type`.
    pub(crate) fn declare(&mut self, model_type: &str) -> &mut Self {
        self.entities.entry(model_type.to_string()).or_default();
        self
    }

    pub(crate) fn pv(&mut self, eid: &str) -> Entity {
        self.entity("PVSim", "pv", eid)
    }

    pub(crate) fn battery(&mut self, eid: &str) -> Entity {
        self.entity("BatSim", "battery", eid)
    }

    pub(crate) fn charging_station(&mut self, eid: &str) -> Entity {
        self.entity("CSSim", "charging_station", eid)
    }

    pub(crate) fn vehicle(&mut self, eid: &str) -> Entity {
        self.entity("EVSim", "car", eid)
    }

    pub(crate) fn hems(&mut self, eid: &str) -> Entity {
        self.entity("EMSSim", "HEMS_default", eid)
    }

    pub(crate) fn grid_ems(&mut self, eid: &str) -> Entity {
        self.entity("EMSSim", "GridEMS", eid)
    }

    pub(crate) fn grid(&mut self) -> Entity {
        self.entity("Grid", "Grid", "0-Grid")
    }

    pub(crate) fn grid_load(&mut self, eid: &str) -> Entity {
        self.entity("Grid", "load", eid)
    }

    /// Creates a forecast provider.  It is known to its simulator, but not
    /// part of the scenario's entity collection.
    pub(crate) fn forecast(&mut self, eid: &str) -> Entity {
        let entity = Self::make("ForecastSim", "Forecast", eid);
        self.created.push(("ForecastSim".to_string(), entity.clone()));
        entity
    }

    /// Connects the given attributes, which keep their names, from model type
    /// `from` to model type `to`.
    pub(crate) fn connect<const N: usize>(
        &mut self,
        from: &str,
        to: &str,
        attributes: [&str; N],
    ) -> &mut Self {
        self.connect_links(from, to, attributes.map(AttrLink::same))
    }

    pub(crate) fn connect_links(
        &mut self,
        from: &str,
        to: &str,
        links: impl IntoIterator<Item = AttrLink>,
    ) -> &mut Self {
        self.matrix.insert(from, to, links);
        self
    }

    pub(crate) fn config(&mut self) -> &mut TopologyConfig {
        &mut self.config
    }

    pub(crate) fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub(crate) fn entities(&self) -> &EntityCollection {
        &self.entities
    }

    pub(crate) fn builder(&self) -> TopologyBuilder<'_> {
        TopologyBuilder::new(&self.registry, &self.matrix, self.config.clone())
    }

    /// Connects all entities of the scenario with each other.
    pub(crate) fn build_topology(&self) -> Result<Topology, Error> {
        let mut builder = self.builder();
        builder.connect_entities(&self.entities)?;
        builder.build()
    }

    /// Connects the entities of the scenario to its grid loads.
    pub(crate) fn build_grid_topology(&self, gcps: &GcpConfig) -> Result<Topology, Error> {
        let grid = GridComponents::from_entities(self.entities.values().flatten());
        let mut builder = self.builder();
        builder.connect_grid(&grid, gcps, &self.entities)?;
        builder.build()
    }

    /// Returns a simulator for every simulator name in the registry, that
    /// knows the entities of the scenario.
    pub(crate) fn simulators(&self) -> Simulators<MockSimulator> {
        let mut simulators = Simulators::new();
        for (model_type, info) in self.registry.models() {
            simulators
                .entry(info.simulator().to_string())
                .or_insert_with(|| MockSimulator::new(info.simulator()))
                .models
                .push(model_type.to_string());
        }
        for (simulator, entity) in &self.created {
            simulators
                .entry(simulator.clone())
                .or_insert_with(|| MockSimulator::new(simulator))
                .entities
                .push(entity.clone());
        }
        simulators
    }
}
