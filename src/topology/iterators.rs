// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Iterators over entities and links in a `Topology`.

use petgraph::graph::{DiGraph, NodeIndex};

use crate::{Entity, Link};

/// An iterator over the entities in a `Topology`.
pub struct Entities<'a> {
    pub(crate) iter: std::slice::Iter<'a, petgraph::graph::Node<Entity>>,
}

impl<'a> Iterator for Entities<'a> {
    type Item = &'a Entity;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|n| &n.weight)
    }
}

/// An iterator over the links in a `Topology`, in the order they were first
/// added.
pub struct Links<'a> {
    pub(crate) iter: indexmap::map::Values<'a, (NodeIndex, NodeIndex), Link>,
}

impl<'a> Iterator for Links<'a> {
    type Item = &'a Link;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

/// An iterator over the neighbors of an entity in a `Topology`.
pub struct Neighbors<'a> {
    pub(crate) graph: &'a DiGraph<Entity, ()>,
    pub(crate) iter: petgraph::graph::Neighbors<'a, ()>,
}

impl<'a> Iterator for Neighbors<'a> {
    type Item = &'a Entity;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|i| &self.graph[i])
    }
}
