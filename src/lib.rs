// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

/*!
# Co-simulation Topology

This is a library for resolving the dataflow topology of an energy
co-simulation: which simulated entities exchange which attributes, in which
direction, and whether a value is read in the same step or one step later.

## Creating entities

The model types of a run are registered in a [`ModelRegistry`], together with
the name of the simulator that provides them and their [`ModelRole`].  The
[`EntityFactory`] creates the entities of a scenario with the simulators of
the run, which implement the [`Simulator`] trait, and groups them by model
type in an [`EntityCollection`].

## Planning connections

The attributes that flow between model types are configured in a
[`ConnectionMatrix`].  A [`TopologyBuilder`] wires the entities in stages:

- [`connect_entities`][TopologyBuilder::connect_entities] connects every pair
  of entity types with the [`ConnectionPlanner`].
- [`connect_grid`][TopologyBuilder::connect_grid] attaches entities to the
  loads of the grid model, as configured in a [`GcpConfig`], with the
  [`GridTopologyBinder`].
- [`connect_forecast`][TopologyBuilder::connect_forecast] connects controllers
  and devices to a forecast provider with the [`ForecastBinder`].

Whenever two types exchange attributes in both directions, one direction is
strong and the other weak.  Weak links are read one step late and carry
initial data for the first step, which breaks the cycle.

## Validation and commit

[`build`][TopologyBuilder::build] checks that the strong links don't form a
cycle, and that every weak link has a strong counterpart, and returns the
[`Topology`].  [`Topology::commit`] then hands every link to the
co-simulation engine, which implements the [`World`] trait, and tells the
simulators which entities their controllers and forecast providers are
responsible for.  Nothing is handed over if anything can't be resolved.
*/

mod config;
pub use config::TopologyConfig;

mod connection_matrix;
pub use connection_matrix::{AttrLink, ConnectionMatrix, GRID_LOAD};

mod entity;
pub use entity::{Entity, EntityCollection, EntityDescriptor};

pub mod entity_index;
pub use entity_index::EntityIndex;

mod error;
pub use error::{Error, ErrorKind};

mod factory;
pub use factory::{EntityFactory, GRID_MODEL_CONFIG};

mod forecast;
pub use forecast::{ForecastBinder, FORECAST, FORECAST_REQUEST};

mod grid;
pub use grid::{GcpConfig, GridComponents, GridConnectionPoint, GridTopologyBinder};

mod model_role;
pub use model_role::{ControllerKind, DeviceKind, ModelRole};

mod planner;
pub use planner::ConnectionPlanner;

mod registry;
pub use registry::{ModelInfo, ModelRegistry};

mod sim_traits;
pub use sim_traits::{Simulator, Simulators, World};

mod topology;
pub use topology::{
    iterators, ControlledEntitySet, ForecastSubjects, InitialData, Link, Strength, Topology,
    TopologyBuilder,
};

#[cfg(test)]
mod test_utils;
