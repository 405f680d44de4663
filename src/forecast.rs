// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Connecting entities to a forecast provider.

use serde_json::Value;

use crate::{
    model_role::RolePredicates, AttrLink, Entity, EntityCollection, Error, InitialData,
    ModelRegistry, Strength, Topology,
};

/// The attribute controllers request forecasts with.
pub const FORECAST_REQUEST: &str = "forecast_request";

/// The attribute forecasts are delivered to controllers with.
pub const FORECAST: &str = "forecast";

/// Connects controllers and devices to a forecast provider.
///
/// Controllers request forecasts over a strong link and receive them over a
/// weak link.  Devices are registered as subjects the provider computes
/// forecasts for.
pub struct ForecastBinder<'a> {
    registry: &'a ModelRegistry,
}

impl<'a> ForecastBinder<'a> {
    /// Creates a new binder for the model types of `registry`.
    pub fn new(registry: &'a ModelRegistry) -> Self {
        Self { registry }
    }

    /// Connects the controllers and devices of `entities` to `forecast`.
    ///
    /// Grid elements and other forecast providers are left out.
    pub fn bind(
        &self,
        topology: &mut Topology,
        forecast: &Entity,
        entities: &EntityCollection,
    ) -> Result<(), Error> {
        let request = [AttrLink::same(FORECAST_REQUEST)];
        let delivery = [AttrLink::same(FORECAST)];

        for (model_type, group) in entities {
            let info = self.registry.info(model_type)?;
            if info.is_grid_element() || info.is_forecast() {
                continue;
            }

            if info.is_device() {
                for device in group {
                    topology.register_forecast_subject(forecast, device);
                }
            } else {
                for controller in group {
                    topology.add_link(controller, forecast, &request, Strength::Strong)?;
                    topology.add_link(
                        forecast,
                        controller,
                        &delivery,
                        Strength::Weak(InitialData::uniform(
                            &delivery,
                            forecast,
                            Value::Object(Default::default()),
                        )),
                    )?;
                }
            }

            if !group.is_empty() {
                tracing::info!(
                    "Connected {} entities of type {} to forecast {}.",
                    group.len(),
                    model_type,
                    forecast.eid()
                );
            }
        }

        Ok(())
    }
}
