// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! The registry of model types known to the simulators of a run.

use indexmap::IndexMap;
use serde_json::Value;

use crate::{model_role::RolePredicates, Error, ModelRole};

/// What the registry knows about a model type.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelInfo {
    simulator: String,
    role: ModelRole,
    family: Option<String>,
}

impl ModelInfo {
    /// Returns the name of the simulator that provides the model type.
    pub fn simulator(&self) -> &str {
        &self.simulator
    }

    /// Returns the role of the model type.
    pub fn role(&self) -> ModelRole {
        self.role
    }

    /// Returns the family the model type belongs to, if it was registered as
    /// a strategy of a family.
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }
}

impl RolePredicates for ModelInfo {
    fn role(&self) -> ModelRole {
        self.role
    }
}

/// Maps model type names to the simulator that provides them and to their
/// role in the topology.
///
/// Model types can also be grouped into families.  The entities of a family
/// are configured together and each of them selects its concrete model type
/// with a `"strategy"` init parameter, e.g. the operating strategies of an
/// energy management system.
#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelInfo>,
    families: IndexMap<String, Vec<String>>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model type provided by `simulator`.
    pub fn register(
        &mut self,
        simulator: impl Into<String>,
        model_type: impl Into<String>,
        role: ModelRole,
    ) -> Result<(), Error> {
        self.insert(simulator.into(), model_type.into(), role, None)
    }

    /// Registers a family of model types provided by `simulator`.
    ///
    /// Every strategy is registered as a model type of its own.
    pub fn register_family<S: Into<String>>(
        &mut self,
        simulator: impl Into<String>,
        family: impl Into<String>,
        strategies: impl IntoIterator<Item = (S, ModelRole)>,
    ) -> Result<(), Error> {
        let simulator = simulator.into();
        let family = family.into();
        if self.models.contains_key(&family) || self.families.contains_key(&family) {
            return Err(Error::invalid_model_registry(format!(
                "Duplicate model type or family: {family}"
            )));
        }

        let mut members = vec![];
        for (strategy, role) in strategies {
            let strategy = strategy.into();
            self.insert(simulator.clone(), strategy.clone(), role, Some(family.clone()))?;
            members.push(strategy);
        }
        if members.is_empty() {
            return Err(Error::invalid_model_registry(format!(
                "Family {family} has no strategies."
            )));
        }
        self.families.insert(family, members);

        Ok(())
    }

    fn insert(
        &mut self,
        simulator: String,
        model_type: String,
        role: ModelRole,
        family: Option<String>,
    ) -> Result<(), Error> {
        if self.models.contains_key(&model_type) || self.families.contains_key(&model_type) {
            return Err(Error::invalid_model_registry(format!(
                "Duplicate model type or family: {model_type}"
            )));
        }
        self.models.insert(
            model_type,
            ModelInfo {
                simulator,
                role,
                family,
            },
        );
        Ok(())
    }

    /// Returns the registry entry of the given model type.
    pub fn info(&self, model_type: &str) -> Result<&ModelInfo, Error> {
        self.models.get(model_type).ok_or_else(|| {
            Error::unknown_model_type(format!("Model type {model_type} is not registered."))
        })
    }

    /// Returns the role of the given model type.
    pub fn role(&self, model_type: &str) -> Result<ModelRole, Error> {
        self.info(model_type).map(|info| info.role)
    }

    /// Returns the position of the given model type in registration order.
    pub(crate) fn position(&self, model_type: &str) -> Result<usize, Error> {
        self.models.get_index_of(model_type).ok_or_else(|| {
            Error::unknown_model_type(format!("Model type {model_type} is not registered."))
        })
    }

    /// Returns the strategies of the given family, if `name` is a family.
    pub fn family(&self, name: &str) -> Option<&[String]> {
        self.families.get(name).map(|members| members.as_slice())
    }

    /// Returns an iterator over the registered model types and their entries,
    /// in registration order.
    pub fn models(&self) -> impl Iterator<Item = (&str, &ModelInfo)> {
        self.models.iter().map(|(name, info)| (name.as_str(), info))
    }

    /// Loads a registry from its JSON representation.
    ///
    /// The expected layout is
    /// `{simulator: {"models": {model_type: role}}}`, where `role` is one of
    /// the strings accepted by [`ModelRole`]'s `FromStr` implementation, or
    /// `{"family": {strategy: role}}` for a family.
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        let simulators = value.as_object().ok_or_else(|| {
            Error::invalid_model_registry("Model registry must be an object of simulators.")
        })?;

        let mut registry = Self::new();
        for (simulator, sim_config) in simulators {
            let models = sim_config
                .get("models")
                .and_then(Value::as_object)
                .ok_or_else(|| {
                    Error::invalid_model_registry(format!(
                        "Simulator {simulator} has no \"models\" object."
                    ))
                })?;

            for (model_type, role) in models {
                match role {
                    Value::String(role) => {
                        registry.register(simulator.as_str(), model_type.as_str(), role.parse()?)?
                    }
                    Value::Object(obj) => {
                        let strategies = obj
                            .get("family")
                            .and_then(Value::as_object)
                            .ok_or_else(|| {
                                Error::invalid_model_registry(format!(
                                    "Model {model_type} of {simulator} has an invalid role."
                                ))
                            })?;
                        let strategies = strategies
                            .iter()
                            .map(|(strategy, role)| {
                                role.as_str()
                                    .ok_or_else(|| {
                                        Error::invalid_model_registry(format!(
                                            "Strategy {strategy} of {model_type} has an invalid role."
                                        ))
                                    })
                                    .and_then(|role| role.parse::<ModelRole>())
                                    .map(|role| (strategy.as_str(), role))
                            })
                            .collect::<Result<Vec<_>, Error>>()?;
                        registry.register_family(
                            simulator.as_str(),
                            model_type.as_str(),
                            strategies,
                        )?;
                    }
                    _ => {
                        return Err(Error::invalid_model_registry(format!(
                            "Model {model_type} of {simulator} has an invalid role."
                        )))
                    }
                }
            }
        }

        Ok(registry)
    }
}
