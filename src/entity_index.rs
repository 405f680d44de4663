// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Lookup of entities by their id, within one typed collection or across all
//! of them.
//!
//! A missing id is an expected outcome and is reported as `None`.  Callers
//! that require the entity turn that into an error themselves.

use std::collections::HashMap;

use crate::{Entity, EntityCollection, EntityDescriptor};

/// Finds the entity with the given `eid` in a list of entities.
pub fn find<'a>(entities: &'a [Entity], eid: &str) -> Option<(&'a Entity, EntityDescriptor)> {
    entities
        .iter()
        .find(|e| e.eid() == eid)
        .map(|e| (e, e.descriptor()))
}

/// Finds the entity with the given `eid` in any of the typed lists of a
/// collection.
///
/// Lists are searched in insertion order, and the first match is returned.
pub fn find_across<'a>(
    collection: &'a EntityCollection,
    eid: &str,
) -> Option<(&'a Entity, EntityDescriptor)> {
    collection.values().find_map(|entities| find(entities, eid))
}

/// An overlay over an [`EntityCollection`] for repeated lookups.
///
/// `EntityIndex` stores the position of every entity by its `eid`, so that
/// entities can be retrieved without scanning the collection.  It returns
/// the same entity as [`find_across`] would.
pub struct EntityIndex<'a> {
    collection: &'a EntityCollection,
    positions: HashMap<&'a str, (usize, usize)>,
}

impl<'a> EntityIndex<'a> {
    /// Creates a new index over the given collection.
    pub fn new(collection: &'a EntityCollection) -> Self {
        let mut positions = HashMap::new();
        for (type_pos, entities) in collection.values().enumerate() {
            for (pos, entity) in entities.iter().enumerate() {
                positions.entry(entity.eid()).or_insert((type_pos, pos));
            }
        }
        Self {
            collection,
            positions,
        }
    }

    /// Returns the entity with the given `eid` and its descriptor, if it
    /// exists.
    pub fn get(&self, eid: &str) -> Option<(&'a Entity, EntityDescriptor)> {
        let (type_pos, pos) = *self.positions.get(eid)?;
        self.collection
            .get_index(type_pos)
            .and_then(|(_, entities)| entities.get(pos))
            .map(|e| (e, e.descriptor()))
    }

    /// Returns the number of indexed entities.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if no entity is indexed.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
