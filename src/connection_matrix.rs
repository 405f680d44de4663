// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! The attribute mappings between pairs of model types.

use indexmap::IndexMap;
use serde_json::Value;

use crate::Error;

/// Name of the pseudo model type that carries the attribute mapping from a
/// device or controller to the grid load it is attached to.
pub const GRID_LOAD: &str = "grid_load";

/// A single attribute link between two entities.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttrLink {
    /// The attribute has the same name on both sides.
    Same(String),
    /// The source attribute is read into a differently named destination
    /// attribute.
    Renamed(String, String),
}

impl AttrLink {
    /// Creates a link between two attributes of the same name.
    pub fn same(name: impl Into<String>) -> Self {
        AttrLink::Same(name.into())
    }

    /// Creates a link from `source` to a differently named `destination`.
    pub fn renamed(source: impl Into<String>, destination: impl Into<String>) -> Self {
        AttrLink::Renamed(source.into(), destination.into())
    }

    /// Returns the name of the attribute on the producing side.
    pub fn source(&self) -> &str {
        match self {
            AttrLink::Same(name) => name,
            AttrLink::Renamed(source, _) => source,
        }
    }

    /// Returns the name of the attribute on the consuming side.
    pub fn destination(&self) -> &str {
        match self {
            AttrLink::Same(name) => name,
            AttrLink::Renamed(_, destination) => destination,
        }
    }

    /// Parses an attribute link from either a string or a two-element array
    /// of strings.
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        match value {
            Value::String(name) => Ok(AttrLink::same(name.as_str())),
            Value::Array(pair) => match pair.as_slice() {
                [Value::String(source), Value::String(destination)] => {
                    Ok(AttrLink::renamed(source.as_str(), destination.as_str()))
                }
                _ => Err(Error::invalid_connection_config(format!(
                    "Attribute pair {value} must consist of exactly two strings."
                ))),
            },
            _ => Err(Error::invalid_connection_config(format!(
                "Attribute link {value} is neither a string nor a pair of strings."
            ))),
        }
    }
}

impl std::fmt::Display for AttrLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrLink::Same(name) => write!(f, "{name}"),
            AttrLink::Renamed(source, destination) => write!(f, "{source}->{destination}"),
        }
    }
}

/// A table of attribute links, keyed by an ordered pair of model types.
///
/// The entry for `(from, to)` lists the attributes that flow from entities of
/// type `from` to entities of type `to`.  Pairs without an entry have no
/// links.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionMatrix {
    links: IndexMap<(String, String), Vec<AttrLink>>,
}

impl ConnectionMatrix {
    /// Creates an empty matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attribute links from model type `from` to model type `to`.
    pub fn insert(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        links: impl IntoIterator<Item = AttrLink>,
    ) -> &mut Self {
        self.links
            .insert((from.into(), to.into()), links.into_iter().collect());
        self
    }

    /// Returns the attribute links from model type `from` to model type `to`.
    pub fn get(&self, from: &str, to: &str) -> &[AttrLink] {
        self.links
            .get(&(from.to_string(), to.to_string()))
            .map(|links| links.as_slice())
            .unwrap_or(&[])
    }

    /// Returns an iterator over all configured pairs and their links.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &[AttrLink])> {
        self.links
            .iter()
            .map(|((from, to), links)| (from.as_str(), to.as_str(), links.as_slice()))
    }

    /// Loads a matrix from its JSON representation
    /// `{from_type: {to_type: [link, ...]}}`.
    ///
    /// The whole matrix is validated before it is returned.
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        let rows = value.as_object().ok_or_else(|| {
            Error::invalid_connection_config("Connection matrix must be an object of model types.")
        })?;

        let mut matrix = Self::new();
        for (from, row) in rows {
            let row = row.as_object().ok_or_else(|| {
                Error::invalid_connection_config(format!(
                    "Connections of {from} must be an object of model types."
                ))
            })?;
            for (to, links) in row {
                let links = links.as_array().ok_or_else(|| {
                    Error::invalid_connection_config(format!(
                        "Connections from {from} to {to} must be a list, not {links}."
                    ))
                })?;
                let links = links
                    .iter()
                    .map(AttrLink::from_json)
                    .collect::<Result<Vec<_>, _>>()?;
                matrix.insert(from.as_str(), to.as_str(), links);
            }
        }

        Ok(matrix)
    }
}
