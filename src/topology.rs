// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! A graph representation of the dataflow between the entities of a
//! co-simulation.

mod commit;
mod creation;
pub mod iterators;
mod retrieval;
mod validation;

pub use creation::TopologyBuilder;

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use serde_json::Value;
use std::collections::HashMap;

use crate::{AttrLink, Entity, EntityDescriptor};

/// `Entity`s stored in a `DiGraph` instance can be addressed with `NodeIndex`es.
///
/// `NodeIndexMap` stores the corresponding `NodeIndex` for any `full_id`, so
/// that entities in the `DiGraph` can be retrieved from their `full_id`s.
pub(crate) type NodeIndexMap = HashMap<String, NodeIndex>;

/// `Link`s are not stored in the `DiGraph` instance, so we need to store them
/// separately.
///
/// `LinkMap` can be used to lookup the `Link` for any pair of source and
/// destination `NodeIndex` values.  It keeps the links in the order they were
/// first requested, which is the order in which they are committed.
pub(crate) type LinkMap = IndexMap<(NodeIndex, NodeIndex), Link>;

/// The subordinate entities a controller is aware of, keyed by their `eid`.
pub type ControlledEntitySet = IndexMap<String, EntityDescriptor>;

/// The entities a forecast provider computes forecasts for, keyed by their
/// `full_id`.
pub type ForecastSubjects = IndexMap<String, EntityDescriptor>;

/// Values a weak link delivers before its source has produced anything.
///
/// Values are keyed by attribute name and then by the `full_id` of the
/// producing entity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InitialData(IndexMap<String, IndexMap<String, Value>>);

impl InitialData {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table that seeds every source attribute of `attributes` with
    /// zero for the given producer.
    pub fn zeroed(attributes: &[AttrLink], producer: &Entity) -> Self {
        Self::uniform(attributes, producer, Value::from(0))
    }

    /// Creates a table that seeds every source attribute of `attributes` with
    /// `value` for the given producer.
    pub fn uniform(attributes: &[AttrLink], producer: &Entity, value: Value) -> Self {
        let mut data = Self::new();
        for attribute in attributes {
            data.insert(attribute.source(), producer.full_id(), value.clone());
        }
        data
    }

    /// Sets the initial value of `attribute` produced by `full_id`.
    pub fn insert(&mut self, attribute: &str, full_id: &str, value: Value) {
        self.0
            .entry(attribute.to_string())
            .or_default()
            .insert(full_id.to_string(), value);
    }

    /// Returns the initial value of `attribute` produced by `full_id`.
    pub fn get(&self, attribute: &str, full_id: &str) -> Option<&Value> {
        self.0.get(attribute).and_then(|values| values.get(full_id))
    }

    /// Returns an iterator over the seeded attributes and their values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexMap<String, Value>)> {
        self.0.iter().map(|(name, values)| (name.as_str(), values))
    }

    /// Returns true if nothing is seeded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the table as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(name, values)| {
                    let values = values
                        .iter()
                        .map(|(full_id, value)| (full_id.clone(), value.clone()))
                        .collect();
                    (name.clone(), Value::Object(values))
                })
                .collect(),
        )
    }

    pub(crate) fn merge(&mut self, other: InitialData) {
        for (name, values) in other.0 {
            self.0.entry(name).or_default().extend(values);
        }
    }
}

/// The strength of a link.
#[derive(Clone, Debug, PartialEq)]
pub enum Strength {
    /// The destination reads the value its source produced in the same step.
    Strong,
    /// The destination reads the value its source produced one step earlier,
    /// and the given initial data in the first step.
    Weak(InitialData),
}

impl Strength {
    /// Returns true for weak links.
    pub fn is_weak(&self) -> bool {
        matches!(self, Strength::Weak(_))
    }

    /// Returns the initial data of a weak link.
    pub fn initial_data(&self) -> Option<&InitialData> {
        match self {
            Strength::Strong => None,
            Strength::Weak(data) => Some(data),
        }
    }
}

impl std::fmt::Display for Strength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strength::Strong => write!(f, "strong"),
            Strength::Weak(_) => write!(f, "weak"),
        }
    }
}

/// A directed link between two entities.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    source: String,
    destination: String,
    attributes: Vec<AttrLink>,
    strength: Strength,
}

impl Link {
    /// Returns the `full_id` of the producing entity.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the `full_id` of the consuming entity.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Returns the attributes carried by the link.
    pub fn attributes(&self) -> &[AttrLink] {
        &self.attributes
    }

    /// Returns the strength of the link.
    pub fn strength(&self) -> &Strength {
        &self.strength
    }
}

/// The dataflow topology of a co-simulation run: the entities, the links
/// between them, and the registries of controllers and forecast providers.
///
/// A `Topology` is built once with a [`TopologyBuilder`] and then handed to
/// the co-simulation engine with [`commit`][Topology::commit].
#[derive(Default)]
pub struct Topology {
    graph: DiGraph<Entity, ()>,
    node_indices: NodeIndexMap,
    links: LinkMap,
    controlled: IndexMap<String, ControlledEntitySet>,
    forecast_subjects: IndexMap<String, ForecastSubjects>,
}
