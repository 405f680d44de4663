// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Creating entities with the simulators of a run.

use indexmap::IndexMap;
use serde_json::Value;

use crate::{
    model_role::RolePredicates, Entity, EntityCollection, Error, GcpConfig, ModelRegistry,
    Simulator, Simulators,
};

/// The init parameter that selects the model type of a family member.
const STRATEGY: &str = "strategy";

/// The init parameter grid controllers receive the GCP configuration in.
pub const GRID_MODEL_CONFIG: &str = "grid_model_config";

/// Creates entities from per-instance init parameters.
pub struct EntityFactory<'a> {
    registry: &'a ModelRegistry,
    gcps: Option<&'a GcpConfig>,
}

impl<'a> EntityFactory<'a> {
    /// Creates a new factory for the model types of `registry`.
    pub fn new(registry: &'a ModelRegistry) -> Self {
        Self {
            registry,
            gcps: None,
        }
    }

    /// Makes the factory pass `gcps` to every grid controller it creates, in
    /// its `"grid_model_config"` init parameter.
    pub fn with_gcp_config(mut self, gcps: &'a GcpConfig) -> Self {
        self.gcps = Some(gcps);
        self
    }

    /// Creates one entity of `model_type` for every object in `init_params`.
    ///
    /// An empty list creates no entities.
    pub fn create<S: Simulator>(
        &self,
        simulators: &mut Simulators<S>,
        model_type: &str,
        init_params: &Value,
    ) -> Result<Vec<Entity>, Error> {
        let info = self.registry.info(model_type)?;
        let simulator_name = info.simulator();
        let simulator = simulators.get_mut(simulator_name).ok_or_else(|| {
            Error::unknown_model_type(format!(
                "Simulator {simulator_name} for model type {model_type} is not running."
            ))
        })?;
        if !simulator.has_model(model_type) {
            return Err(Error::unknown_model_type(format!(
                "Simulator {simulator_name} has no model type {model_type}."
            )));
        }

        let init_vals = init_params.as_array().ok_or_else(|| {
            Error::invalid_init_shape(format!(
                "Init params of {model_type} must be a list, not {init_params}."
            ))
        })?;
        if let Some(value) = init_vals.iter().find(|v| !v.is_object()) {
            return Err(Error::invalid_init_shape(format!(
                "Init params of {model_type} must be objects, not {value}."
            )));
        }
        if init_vals.is_empty() {
            return Ok(vec![]);
        }

        let mut init_vals = init_vals.clone();
        if let Some(gcps) = self.gcps.filter(|_| info.is_grid_controller()) {
            let config = gcps.to_json();
            for fields in init_vals.iter_mut().filter_map(Value::as_object_mut) {
                fields.insert(GRID_MODEL_CONFIG.to_string(), config.clone());
            }
        }

        let entities = simulator.create(model_type, init_vals.len(), &init_vals);
        if entities.len() != init_vals.len() {
            return Err(Error::internal(format!(
                "Simulator {simulator_name} created {} entities of {model_type}, expected {}.",
                entities.len(),
                init_vals.len()
            )));
        }

        tracing::info!(
            "Created {} entities of model type {} with simulator {}.",
            entities.len(),
            model_type,
            simulator_name
        );
        Ok(entities)
    }

    /// Creates the entities of a scenario, in scenario order.
    ///
    /// `scenario` maps model types, or families, to lists of init parameters.
    /// The instances of a family are grouped by their `"strategy"` parameter,
    /// which names the model type they are created as, and the groups take
    /// the family's place.  Registered model types that the scenario doesn't
    /// mention get an empty group after the scenario's own groups.
    pub fn create_all<S: Simulator>(
        &self,
        simulators: &mut Simulators<S>,
        scenario: &Value,
    ) -> Result<EntityCollection, Error> {
        let scenario = scenario.as_object().ok_or_else(|| {
            Error::invalid_init_shape("Scenario must be an object of model types.")
        })?;
        for model_type in scenario.keys() {
            if self.registry.family(model_type).is_none() {
                self.registry.info(model_type)?;
            }
        }

        let mut entities = EntityCollection::new();
        for (name, init_params) in scenario {
            if self.registry.family(name).is_none() {
                let created = self.create(simulators, name, init_params)?;
                entities.insert(name.clone(), created);
                continue;
            }
            for (strategy, init_vals) in self.split_family(name, init_params)? {
                let created = self.create(simulators, &strategy, &Value::Array(init_vals))?;
                entities.insert(strategy, created);
            }
        }

        for (model_type, info) in self.registry.models() {
            if info.family().is_none() && !entities.contains_key(model_type) {
                entities.insert(model_type.to_string(), vec![]);
            }
        }

        Ok(entities)
    }

    /// Groups the init parameters of a family by strategy, in order of first
    /// appearance.
    fn split_family(
        &self,
        family: &str,
        init_params: &Value,
    ) -> Result<IndexMap<String, Vec<Value>>, Error> {
        let init_vals = init_params.as_array().ok_or_else(|| {
            Error::invalid_init_shape(format!(
                "Init params of {family} must be a list, not {init_params}."
            ))
        })?;
        let strategies = self.registry.family(family).unwrap_or_default();

        let mut groups: IndexMap<String, Vec<Value>> = IndexMap::new();
        for value in init_vals {
            let strategy = value
                .get(STRATEGY)
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    Error::invalid_init_shape(format!(
                        "Instance of {family} has no {STRATEGY}: {value}"
                    ))
                })?;
            if !strategies.iter().any(|s| s == strategy) {
                return Err(Error::unknown_model_type(format!(
                    "Strategy {strategy} is not part of family {family}."
                )));
            }
            groups
                .entry(strategy.to_string())
                .or_default()
                .push(value.clone());
        }

        Ok(groups)
    }
}
