// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Pairwise wiring of entity types.
//!
//! For every pair of entity types, one direction is *strong*: the consumer
//! reads the value the producer computed in the same step.  If attributes also
//! flow back, the reverse direction is *weak*: it is read one step late, and
//! is seeded with zeros so that the first step has a value to read.
//!
//! The direction is decided from the roles of the two types:
//!  - devices report to controllers in the same step, and controllers send
//!    their setpoints back with a delay,
//!  - charging stations send setpoints to vehicles in the same step, and
//!    vehicles report back with a delay,
//!  - otherwise, a mapping in only one direction is strong, and for mappings
//!    in both directions the type registered first is the strong side.
//!
//! None of these depend on the order the types are walked in, so a pair is
//! wired the same way in every group it appears in.

use crate::{
    model_role::RolePredicates, AttrLink, ConnectionMatrix, Entity, EntityCollection, Error,
    InitialData, ModelRegistry, Strength, Topology, TopologyConfig,
};

/// Wires pairs of entity types according to a [`ConnectionMatrix`].
pub struct ConnectionPlanner<'a> {
    registry: &'a ModelRegistry,
    matrix: &'a ConnectionMatrix,
    config: &'a TopologyConfig,
}

impl<'a> ConnectionPlanner<'a> {
    /// Creates a new planner.
    pub fn new(
        registry: &'a ModelRegistry,
        matrix: &'a ConnectionMatrix,
        config: &'a TopologyConfig,
    ) -> Self {
        Self {
            registry,
            matrix,
            config,
        }
    }

    pub(crate) fn registry(&self) -> &'a ModelRegistry {
        self.registry
    }

    pub(crate) fn matrix(&self) -> &'a ConnectionMatrix {
        self.matrix
    }

    pub(crate) fn config(&self) -> &'a TopologyConfig {
        self.config
    }

    /// Connects every pair of entity types in `groups` with each other.
    ///
    /// Each unordered pair of types is considered once, in the order of the
    /// collection.  Controllers become aware of all the entities that report
    /// to them.
    pub fn connect_groups(
        &self,
        topology: &mut Topology,
        groups: &EntityCollection,
    ) -> Result<(), Error> {
        let types = groups.keys().collect::<Vec<_>>();

        for (outer, type_from) in types.iter().enumerate() {
            for type_to in &types[outer + 1..] {
                let (strong_type, weak_type) = self.orient(type_from, type_to)?;
                self.connect_two_types(
                    topology,
                    strong_type,
                    &groups[strong_type],
                    weak_type,
                    &groups[weak_type],
                )?;
            }
        }

        if !self.config.skip_vehicle_tracking {
            self.track_vehicles(topology, groups)?;
        }

        Ok(())
    }

    /// Returns the given pair of types as `(strong source, weak source)`.
    fn orient<'t>(
        &self,
        type_from: &'t str,
        type_to: &'t str,
    ) -> Result<(&'t str, &'t str), Error> {
        let role_from = self.registry.role(type_from)?;
        let role_to = self.registry.role(type_to)?;

        let swap = if role_from.is_controller() != role_to.is_controller() {
            role_from.is_controller()
        } else if role_from.is_vehicle() && role_to.is_charging_station() {
            true
        } else if role_from.is_charging_station() && role_to.is_vehicle() {
            false
        } else {
            let forward = !self.matrix.get(type_from, type_to).is_empty();
            let reverse = !self.matrix.get(type_to, type_from).is_empty();
            match (forward, reverse) {
                (false, true) => true,
                (true, true) => {
                    self.registry.position(type_to)? < self.registry.position(type_from)?
                }
                _ => false,
            }
        };

        if swap {
            Ok((type_to, type_from))
        } else {
            Ok((type_from, type_to))
        }
    }

    /// Connects every entity of the strong type with every entity of the weak
    /// type.
    ///
    /// Returns an error if there are attributes from the weak to the strong
    /// type, but none from the strong to the weak type.  Nothing is connected
    /// in that case.
    pub(crate) fn connect_two_types(
        &self,
        topology: &mut Topology,
        strong_type: &str,
        strong: &[Entity],
        weak_type: &str,
        weak: &[Entity],
    ) -> Result<(), Error> {
        let forward = self.matrix.get(strong_type, weak_type);
        let reverse = self.matrix.get(weak_type, strong_type);

        if forward.is_empty() {
            if !reverse.is_empty() {
                return Err(Error::dangling_weak_connection(format!(
                    "{weak_type} -> {strong_type} has attributes, but {strong_type} -> {weak_type} has none."
                )));
            }
            return Ok(());
        }

        let weak_is_controller = self.registry.info(weak_type)?.is_controller();

        for strong_entity in strong {
            for weak_entity in weak {
                topology.add_link(strong_entity, weak_entity, forward, Strength::Strong)?;

                if !reverse.is_empty() {
                    topology.add_link(
                        weak_entity,
                        strong_entity,
                        reverse,
                        Strength::Weak(InitialData::zeroed(reverse, weak_entity)),
                    )?;
                }

                if weak_is_controller {
                    topology.register_controlled(weak_entity, strong_entity);
                }
            }
        }

        if !strong.is_empty() && !weak.is_empty() {
            tracing::info!(
                "Added connections between {} and {}.",
                strong_type,
                weak_type
            );
        }

        Ok(())
    }

    /// Makes every controller in `groups` aware of every vehicle in `groups`.
    ///
    /// Vehicles usually only exchange data with their charging station, but
    /// controllers still need to know them to plan charging.
    fn track_vehicles(
        &self,
        topology: &mut Topology,
        groups: &EntityCollection,
    ) -> Result<(), Error> {
        let mut controllers = vec![];
        let mut vehicles = vec![];
        for (model_type, entities) in groups {
            let info = self.registry.info(model_type)?;
            if info.is_controller() {
                controllers.extend(entities);
            } else if info.is_vehicle() {
                vehicles.extend(entities);
            }
        }

        for controller in &controllers {
            for vehicle in &vehicles {
                topology.register_controlled(controller, vehicle);
            }
        }

        Ok(())
    }
}

/// Returns the attributes of `links` joined for log messages.
pub(crate) fn attribute_names(links: &[AttrLink]) -> String {
    links
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
