// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module contains the traits that need to be implemented by the
//! co-simulation engine that executes the topology.

use indexmap::IndexMap;
use serde_json::Value;

use crate::{AttrLink, ControlledEntitySet, Entity, Strength};

/**
This trait needs to be implemented by the type that owns the dataflow graph of
the co-simulation, and steps through it.

<details>
<summary>Example implementation that forwards to a scenario world:</summary>

```ignore
impl cosim_topology::World for ScenarioWorld {
    fn connect(
        &mut self,
        source: &cosim_topology::Entity,
        destination: &cosim_topology::Entity,
        attributes: &[cosim_topology::AttrLink],
        strength: &cosim_topology::Strength,
    ) {
        let pairs = attributes
            .iter()
            .map(|a| (a.source().to_string(), a.destination().to_string()))
            .collect::<Vec<_>>();
        match strength {
            cosim_topology::Strength::Strong => {
                self.connect_strong(source.full_id(), destination.full_id(), &pairs)
            }
            cosim_topology::Strength::Weak(initial_data) => self.connect_weak(
                source.full_id(),
                destination.full_id(),
                &pairs,
                initial_data.to_json(),
            ),
        }
    }
}
```

</details>
*/
pub trait World {
    /// Registers one directed link from `source` to `destination`.
    ///
    /// Weak links carry the values the destination reads before the source
    /// has produced anything.
    fn connect(
        &mut self,
        source: &Entity,
        destination: &Entity,
        attributes: &[AttrLink],
        strength: &Strength,
    );
}

/// This trait needs to be implemented by the simulators that create and own
/// the entities.
pub trait Simulator {
    /// Returns true if the simulator provides the given model type.
    fn has_model(&self, model_type: &str) -> bool;

    /// Creates `num` entities of the given model type, one for each of the
    /// given init values.
    fn create(&mut self, model_type: &str, num: usize, init_vals: &[Value]) -> Vec<Entity>;

    /// Returns the simulator's own entry for the entity with the given `eid`.
    fn get_entity_by_id(&self, eid: &str) -> Option<Entity>;

    /// Makes the given entities known to the controller with the given `eid`.
    fn add_controlled_entity(&mut self, controller_eid: &str, entities: &ControlledEntitySet) {
        tracing::warn!(
            "Simulator can't register {} controlled entities for {}.",
            entities.len(),
            controller_eid
        );
    }

    /// Adds the given entities, keyed by their full ids, to the subjects of the
    /// forecast entity with the given `eid`.
    fn add_forecasted_entity(&mut self, forecast_eid: &str, subjects: &IndexMap<String, Entity>) {
        tracing::warn!(
            "Simulator can't register {} forecast subjects for {}.",
            subjects.len(),
            forecast_eid
        );
    }
}

impl<S: Simulator + ?Sized> Simulator for Box<S> {
    fn has_model(&self, model_type: &str) -> bool {
        (**self).has_model(model_type)
    }

    fn create(&mut self, model_type: &str, num: usize, init_vals: &[Value]) -> Vec<Entity> {
        (**self).create(model_type, num, init_vals)
    }

    fn get_entity_by_id(&self, eid: &str) -> Option<Entity> {
        (**self).get_entity_by_id(eid)
    }

    fn add_controlled_entity(&mut self, controller_eid: &str, entities: &ControlledEntitySet) {
        (**self).add_controlled_entity(controller_eid, entities)
    }

    fn add_forecasted_entity(&mut self, forecast_eid: &str, subjects: &IndexMap<String, Entity>) {
        (**self).add_forecasted_entity(forecast_eid, subjects)
    }
}

/// The simulators of a run, keyed by the simulator names used in the
/// [`ModelRegistry`][crate::ModelRegistry].
pub type Simulators<S> = IndexMap<String, S>;
