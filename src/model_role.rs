// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module defines the `ModelRole` enum, which represents the capability
//! of a model type inside the dataflow topology.

use std::fmt::Display;
use std::str::FromStr;

use crate::Error;

/// Represents the kind of a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    Generic,
    Vehicle,
    ChargingStation,
}

impl Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Generic => write!(f, "Generic"),
            DeviceKind::Vehicle => write!(f, "Vehicle"),
            DeviceKind::ChargingStation => write!(f, "ChargingStation"),
        }
    }
}

/// Represents the scope of a controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerKind {
    /// Controls the devices behind a single grid connection point, e.g. a
    /// home energy management system.
    Local,
    /// Observes the whole grid.
    Grid,
}

impl Display for ControllerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerKind::Local => write!(f, "Local"),
            ControllerKind::Grid => write!(f, "Grid"),
        }
    }
}

/// Represents the role of a model type.
///
/// Every model type gets its role when it is registered in the
/// [`ModelRegistry`][crate::ModelRegistry], so that the direction of the
/// links between two model types never has to be guessed from type names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelRole {
    Device(DeviceKind),
    Controller(ControllerKind),
    GridElement,
    Forecast,
}

impl Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelRole::Device(DeviceKind::Generic) => write!(f, "Device"),
            ModelRole::Device(kind) => write!(f, "{}Device", kind),
            ModelRole::Controller(kind) => write!(f, "{}Controller", kind),
            ModelRole::GridElement => write!(f, "GridElement"),
            ModelRole::Forecast => write!(f, "Forecast"),
        }
    }
}

impl FromStr for ModelRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "device" => Ok(ModelRole::Device(DeviceKind::Generic)),
            "vehicle" => Ok(ModelRole::Device(DeviceKind::Vehicle)),
            "charging_station" => Ok(ModelRole::Device(DeviceKind::ChargingStation)),
            "controller" => Ok(ModelRole::Controller(ControllerKind::Local)),
            "grid_controller" => Ok(ModelRole::Controller(ControllerKind::Grid)),
            "grid_element" => Ok(ModelRole::GridElement),
            "forecast" => Ok(ModelRole::Forecast),
            _ => Err(Error::invalid_model_registry(format!(
                "Unknown model role: {s}"
            ))),
        }
    }
}

/// Predicates for checking the role of a model type.
pub(crate) trait RolePredicates {
    fn role(&self) -> ModelRole;

    fn is_device(&self) -> bool {
        matches!(self.role(), ModelRole::Device(_))
    }

    fn is_vehicle(&self) -> bool {
        self.role() == ModelRole::Device(DeviceKind::Vehicle)
    }

    fn is_charging_station(&self) -> bool {
        self.role() == ModelRole::Device(DeviceKind::ChargingStation)
    }

    fn is_controller(&self) -> bool {
        matches!(self.role(), ModelRole::Controller(_))
    }

    fn is_grid_controller(&self) -> bool {
        self.role() == ModelRole::Controller(ControllerKind::Grid)
    }

    fn is_grid_element(&self) -> bool {
        self.role() == ModelRole::GridElement
    }

    fn is_forecast(&self) -> bool {
        self.role() == ModelRole::Forecast
    }
}

impl RolePredicates for ModelRole {
    fn role(&self) -> ModelRole {
        *self
    }
}
