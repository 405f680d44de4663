// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Entities created by the simulators, and the collections they are grouped
//! in.

use indexmap::IndexMap;

/// A runtime instance of a simulated model.
///
/// Entities are owned by the co-simulation engine.  The topology only refers
/// to them through their identifiers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Entity {
    eid: String,
    full_id: String,
    model_type: String,
}

impl Entity {
    /// Creates a new entity.
    ///
    /// `eid` is unique within the entity's simulator, `full_id` is unique
    /// across all simulators.
    pub fn new(
        eid: impl Into<String>,
        full_id: impl Into<String>,
        model_type: impl Into<String>,
    ) -> Self {
        Self {
            eid: eid.into(),
            full_id: full_id.into(),
            model_type: model_type.into(),
        }
    }

    /// Returns the id of the entity within its simulator.
    pub fn eid(&self) -> &str {
        &self.eid
    }

    /// Returns the simulator-qualified id of the entity.
    pub fn full_id(&self) -> &str {
        &self.full_id
    }

    /// Returns the name of the model type of the entity.
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    /// Returns a normalized descriptor of the entity.
    pub fn descriptor(&self) -> EntityDescriptor {
        EntityDescriptor {
            id: self.eid.clone(),
            full_id: self.full_id.clone(),
            model_type: self.model_type.clone(),
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_id)
    }
}

/// The `{id, full_id, type}` record that controllers keep about the entities
/// they control.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityDescriptor {
    pub id: String,
    pub full_id: String,
    pub model_type: String,
}

/// Entities grouped by the name of their model type.
///
/// Insertion order is the order in which model types get wired.
pub type EntityCollection = IndexMap<String, Vec<Entity>>;
