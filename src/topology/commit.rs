// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Handing a built [`Topology`] to the co-simulation engine.

use indexmap::IndexMap;

use crate::{Error, ModelRegistry, Simulator, Simulators, Topology, World};

impl Topology {
    /// Registers all links with the given world, and the controlled entities
    /// and forecast subjects with the simulators that own the controllers and
    /// forecast providers.
    ///
    /// All simulators and entities are looked up before anything is
    /// registered, so an error leaves the world and the simulators untouched.
    pub fn commit<W, S>(
        &self,
        world: &mut W,
        registry: &ModelRegistry,
        simulators: &mut Simulators<S>,
    ) -> Result<(), Error>
    where
        W: World,
        S: Simulator,
    {
        let mut controlled = vec![];
        for (controller, set) in &self.controlled {
            let controller = self.entity(controller)?;
            let simulator = simulator_of(registry, simulators, controller.model_type())?;
            controlled.push((simulator, controller.eid(), set));
        }

        let mut forecasts = vec![];
        for (forecast, subjects) in &self.forecast_subjects {
            let forecast = self.entity(forecast)?;
            let simulator = simulator_of(registry, simulators, forecast.model_type())?;

            let mut handles = IndexMap::new();
            for (full_id, subject) in subjects {
                let subject_sim = simulator_of(registry, simulators, &subject.model_type)?;
                let handle = simulators
                    .get(subject_sim)
                    .and_then(|sim| sim.get_entity_by_id(&subject.id))
                    .ok_or_else(|| {
                        Error::unknown_entity_reference(format!(
                            "Simulator {subject_sim} has no entity {}.",
                            subject.id
                        ))
                    })?;
                handles.insert(full_id.clone(), handle);
            }
            forecasts.push((simulator, forecast.eid(), handles));
        }

        for ((source, destination), link) in &self.links {
            world.connect(
                &self.graph[*source],
                &self.graph[*destination],
                link.attributes(),
                link.strength(),
            );
        }
        tracing::info!("Committed {} links.", self.links.len());

        for (simulator, controller, set) in controlled {
            running(simulators, simulator)?.add_controlled_entity(controller, set);
            tracing::info!(
                "Registered {} controlled entities with {}.",
                set.len(),
                controller
            );
        }

        for (simulator, forecast, handles) in forecasts {
            running(simulators, simulator)?.add_forecasted_entity(forecast, &handles);
            tracing::info!(
                "Registered {} forecast subjects with {}.",
                handles.len(),
                forecast
            );
        }

        Ok(())
    }
}

/// Returns the name of the running simulator that provides `model_type`.
fn simulator_of<'a, S>(
    registry: &'a ModelRegistry,
    simulators: &Simulators<S>,
    model_type: &str,
) -> Result<&'a str, Error> {
    let simulator = registry.info(model_type)?.simulator();
    if !simulators.contains_key(simulator) {
        return Err(Error::unknown_model_type(format!(
            "Simulator {simulator} for model type {model_type} is not running."
        )));
    }
    Ok(simulator)
}

fn running<'a, S>(simulators: &'a mut Simulators<S>, simulator: &str) -> Result<&'a mut S, Error> {
    simulators
        .get_mut(simulator)
        .ok_or_else(|| Error::internal(format!("Simulator {simulator} disappeared.")))
}
