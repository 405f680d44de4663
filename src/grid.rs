// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Attaching entities to the grid.
//!
//! Grid connection points (GCPs) are the loads of the grid model.  Each of
//! them has at most one *primary occupant*, the controller or device whose
//! power values the grid load reads.  All other entities configured at a GCP
//! are *behind* it, and are only connected with each other.

use indexmap::IndexMap;
use serde_json::Value;

use crate::{
    model_role::RolePredicates, planner::attribute_names, ConnectionPlanner, Entity,
    EntityCollection, EntityIndex, Error, Strength, Topology, GRID_LOAD,
};

/// The components of a grid model, grouped by their kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridComponents {
    pub grid: Option<Entity>,
    pub buses: Vec<Entity>,
    pub loads: Vec<Entity>,
    pub transformers: Vec<Entity>,
    pub lines: Vec<Entity>,
    pub external_grids: Vec<Entity>,
}

impl GridComponents {
    /// Groups the entities created by a grid simulator by their model type.
    ///
    /// The loads that represent an external grid are not grid connection
    /// points and are left out.  Entities of other types are ignored.
    pub fn from_entities<'e>(entities: impl IntoIterator<Item = &'e Entity>) -> Self {
        let mut components = Self::default();
        for entity in entities {
            match entity.model_type() {
                "Grid" | "grid" => components.grid = Some(entity.clone()),
                "bus" => components.buses.push(entity.clone()),
                "load" if !entity.eid().contains("ext_load") => {
                    components.loads.push(entity.clone())
                }
                "trafo" => components.transformers.push(entity.clone()),
                "line" => components.lines.push(entity.clone()),
                "ext_grid" => components.external_grids.push(entity.clone()),
                _ => {}
            }
        }
        components
    }

    /// Returns the grid load with the given `eid`.
    pub fn load(&self, eid: &str) -> Option<&Entity> {
        self.loads.iter().find(|l| l.eid() == eid)
    }
}

/// The configuration of a single grid connection point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridConnectionPoint {
    /// Ids of the entities at the GCP, by configuration category.
    pub entities: IndexMap<String, Vec<String>>,
    /// Id of the controller that occupies the GCP, if any.
    pub controller: Option<String>,
}

/// Grid connection points, keyed by the `eid` of their grid load.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GcpConfig {
    gcps: IndexMap<String, GridConnectionPoint>,
}

impl GcpConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a grid connection point.
    pub fn insert(&mut self, gcp_id: impl Into<String>, gcp: GridConnectionPoint) -> &mut Self {
        self.gcps.insert(gcp_id.into(), gcp);
        self
    }

    /// Returns an iterator over the grid connection points, in configuration
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &GridConnectionPoint)> {
        self.gcps.iter().map(|(id, gcp)| (id.as_str(), gcp))
    }

    /// Returns the configuration in the same JSON representation
    /// [`from_json`][GcpConfig::from_json] reads, with an empty string for
    /// GCPs without a controller.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.gcps
                .iter()
                .map(|(gcp_id, gcp)| {
                    let mut fields = gcp
                        .entities
                        .iter()
                        .map(|(category, ids)| (category.clone(), Value::from(ids.clone())))
                        .collect::<serde_json::Map<_, _>>();
                    fields.insert(
                        "controller".to_string(),
                        Value::from(gcp.controller.clone().unwrap_or_default()),
                    );
                    (gcp_id.clone(), Value::Object(fields))
                })
                .collect(),
        )
    }

    /// Loads the configuration from its JSON representation
    /// `{gcp_id: {"controller": id | "" | null, category: [entity ids]}}`.
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        let gcps = value.as_object().ok_or_else(|| {
            Error::invalid_connection_config("GCP configuration must be an object of loads.")
        })?;

        let mut config = Self::new();
        for (gcp_id, gcp_value) in gcps {
            let fields = gcp_value.as_object().ok_or_else(|| {
                Error::invalid_connection_config(format!("GCP {gcp_id} must be an object."))
            })?;

            let mut gcp = GridConnectionPoint::default();
            for (key, value) in fields {
                if key == "controller" {
                    gcp.controller = match value {
                        Value::Null => None,
                        Value::String(id) if id.is_empty() => None,
                        Value::String(id) => Some(id.clone()),
                        _ => {
                            return Err(Error::invalid_connection_config(format!(
                                "Controller of GCP {gcp_id} must be a string."
                            )))
                        }
                    };
                    continue;
                }
                let ids = value
                    .as_array()
                    .and_then(|ids| {
                        ids.iter()
                            .map(|id| id.as_str().map(str::to_string))
                            .collect::<Option<Vec<_>>>()
                    })
                    .ok_or_else(|| {
                        Error::invalid_connection_config(format!(
                            "{key} of GCP {gcp_id} must be a list of entity ids."
                        ))
                    })?;
                gcp.entities.insert(key.clone(), ids);
            }
            config.insert(gcp_id.as_str(), gcp);
        }

        Ok(config)
    }
}

/// Connects entities to the grid loads configured in a [`GcpConfig`].
pub struct GridTopologyBinder<'a> {
    planner: &'a ConnectionPlanner<'a>,
}

impl<'a> GridTopologyBinder<'a> {
    /// Creates a new binder that uses `planner` to connect the entities
    /// behind each grid connection point.
    pub fn new(planner: &'a ConnectionPlanner<'a>) -> Self {
        Self { planner }
    }

    /// Connects the entities to the grid.
    ///
    /// GCPs whose load is missing from the grid are skipped.
    pub fn bind(
        &self,
        topology: &mut Topology,
        grid: &GridComponents,
        gcps: &GcpConfig,
        entities: &EntityCollection,
    ) -> Result<(), Error> {
        let grid_controller = self.bind_grid_controller(topology, grid, entities)?;
        let index = EntityIndex::new(entities);

        for (gcp_id, gcp) in gcps.iter() {
            let mut behind = self.resolve(&index, gcp_id, gcp)?;

            let Some(load) = grid.load(gcp_id) else {
                tracing::debug!("GCP {} is not a load of the grid, skipping.", gcp_id);
                continue;
            };

            if let Some(controller_id) = gcp.controller.as_deref() {
                let (controller, _) = index.get(controller_id).ok_or_else(|| {
                    Error::unknown_entity_reference(format!(
                        "Controller {controller_id} of GCP {gcp_id} was not created."
                    ))
                })?;
                if !self.attach(topology, controller, load)? {
                    self.unoccupied(load)?;
                }
                if let Some(grid_controller) = grid_controller {
                    tracing::debug!(
                        "Grid controller {} is not wired to controller {}.",
                        grid_controller.eid(),
                        controller.eid()
                    );
                }
                behind.insert(controller.model_type().to_string(), vec![controller.clone()]);
            } else {
                let mut primary: Option<&Entity> = None;
                for entity in behind.values().flatten() {
                    if self
                        .planner
                        .matrix()
                        .get(entity.model_type(), GRID_LOAD)
                        .is_empty()
                    {
                        tracing::info!(
                            "{} is not connected to the grid directly, it has no {} attributes.",
                            entity.eid(),
                            GRID_LOAD
                        );
                        continue;
                    }
                    if let Some(primary) = primary {
                        return Err(Error::multiple_primary_occupants(format!(
                            "{} can't be connected to both {} and {}.",
                            load.eid(),
                            primary.eid(),
                            entity.eid()
                        )));
                    }
                    self.attach(topology, entity, load)?;
                    primary = Some(entity);

                    if let Some(grid_controller) = grid_controller {
                        tracing::debug!(
                            "Grid controller {} is not wired to {}.",
                            grid_controller.eid(),
                            entity.eid()
                        );
                    }
                }
                if primary.is_none() {
                    self.unoccupied(load)?;
                }
            }

            self.planner.connect_groups(topology, &behind)?;
        }

        Ok(())
    }

    /// Resolves the entities configured at a GCP and groups them by type.
    fn resolve(
        &self,
        index: &EntityIndex<'_>,
        gcp_id: &str,
        gcp: &GridConnectionPoint,
    ) -> Result<EntityCollection, Error> {
        let mut behind = EntityCollection::new();
        for id in gcp.entities.values().flatten() {
            let Some((entity, _)) = index.get(id) else {
                tracing::error!(
                    "Entity {} is configured at GCP {} but was not created.",
                    id,
                    gcp_id
                );
                return Err(Error::unknown_entity_reference(format!(
                    "Entity {id} is configured at GCP {gcp_id} but was not created."
                )));
            };
            behind
                .entry(entity.model_type().to_string())
                .or_default()
                .push(entity.clone());
        }

        let registry = self.planner.registry();
        let mut has_vehicles = false;
        let mut has_stations = false;
        for model_type in behind.keys() {
            let info = registry.info(model_type)?;
            has_vehicles |= info.is_vehicle();
            has_stations |= info.is_charging_station();
        }
        if has_vehicles && !has_stations {
            return Err(Error::missing_charging_station(format!(
                "GCP {gcp_id} has vehicles but no charging station."
            )));
        }

        Ok(behind)
    }

    /// Connects `entity` to `load` with its grid load attributes.
    ///
    /// Returns false if there are no such attributes.
    fn attach(
        &self,
        topology: &mut Topology,
        entity: &Entity,
        load: &Entity,
    ) -> Result<bool, Error> {
        let attributes = self.planner.matrix().get(entity.model_type(), GRID_LOAD);
        if attributes.is_empty() {
            tracing::warn!(
                "{} has no {} attributes and can't occupy {}.",
                entity.eid(),
                GRID_LOAD,
                load.eid()
            );
            return Ok(false);
        }

        topology.add_link(entity, load, attributes, Strength::Strong)?;
        tracing::info!(
            "{} connected to grid at {} ({}).",
            entity.eid(),
            load.eid(),
            attribute_names(attributes)
        );
        Ok(true)
    }

    fn unoccupied(&self, load: &Entity) -> Result<(), Error> {
        if self.planner.config().reject_unoccupied_grid_loads {
            return Err(Error::invalid_topology(format!(
                "No entity connected to grid at {}.",
                load.eid()
            )));
        }
        tracing::warn!("No entity connected to grid at {}.", load.eid());
        Ok(())
    }

    /// Connects the grid to the grid controller, if there is one.
    fn bind_grid_controller<'e>(
        &self,
        topology: &mut Topology,
        grid: &GridComponents,
        entities: &'e EntityCollection,
    ) -> Result<Option<&'e Entity>, Error> {
        let registry = self.planner.registry();
        let mut grid_controller = None;
        for (model_type, group) in entities {
            // Grid models are not necessarily registered.
            if registry
                .info(model_type)
                .is_ok_and(|info| info.is_grid_controller())
            {
                grid_controller = group.first();
                break;
            }
        }

        let (Some(controller), Some(grid)) = (grid_controller, grid.grid.as_ref()) else {
            return Ok(grid_controller);
        };

        let attributes = self
            .planner
            .matrix()
            .get(grid.model_type(), controller.model_type());
        if attributes.is_empty() {
            tracing::warn!(
                "Grid controller {} has no attributes to read from grid {}.",
                controller.eid(),
                grid.eid()
            );
            return Ok(grid_controller);
        }

        topology.add_link(grid, controller, attributes, Strength::Strong)?;
        tracing::info!(
            "Grid {} connected to grid controller {}.",
            grid.eid(),
            controller.eid()
        );

        Ok(grid_controller)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::ScenarioBuilder;
    use crate::AttrLink;

    fn gcp(entities: &[(&str, &[&str])], controller: Option<&str>) -> GridConnectionPoint {
        GridConnectionPoint {
            entities: entities
                .iter()
                .map(|(category, ids)| {
                    (
                        category.to_string(),
                        ids.iter().map(|id| id.to_string()).collect(),
                    )
                })
                .collect(),
            controller: controller.map(str::to_string),
        }
    }

    fn ev_scenario() -> (ScenarioBuilder, Entity, Entity) {
        let mut scenario = ScenarioBuilder::new();
        let cs = scenario.charging_station("CS_0");
        let ev = scenario.vehicle("EV_0");
        scenario
            .connect("charging_station", "car", ["p_set"])
            .connect("car", "charging_station", ["p_avail"])
            .connect_links(
                "charging_station",
                GRID_LOAD,
                [AttrLink::renamed("p", "p_mw")],
            );
        (scenario, cs, ev)
    }

    #[test]
    fn test_grid_components() {
        let entities = [
            Entity::new("0-Grid", "Grid-0.0-Grid", "Grid"),
            Entity::new("0-bus_1", "Grid-0.0-bus_1", "bus"),
            Entity::new("0-load_1", "Grid-0.0-load_1", "load"),
            Entity::new("0-ext_load_1", "Grid-0.0-ext_load_1", "load"),
            Entity::new("0-trafo_1", "Grid-0.0-trafo_1", "trafo"),
            Entity::new("0-line_1", "Grid-0.0-line_1", "line"),
            Entity::new("0-ext_grid_1", "Grid-0.0-ext_grid_1", "ext_grid"),
        ];
        let components = GridComponents::from_entities(&entities);

        assert_eq!(components.grid.as_ref(), Some(&entities[0]));
        assert_eq!(components.buses, [entities[1].clone()]);
        assert_eq!(components.loads, [entities[2].clone()]);
        assert_eq!(components.transformers.len(), 1);
        assert_eq!(components.lines.len(), 1);
        assert_eq!(components.external_grids.len(), 1);
        assert_eq!(components.load("0-load_1"), Some(&entities[2]));
        assert!(components.load("0-ext_load_1").is_none());
    }

    #[test]
    fn test_gcp_config_from_json() -> Result<(), Error> {
        let config = GcpConfig::from_json(&json!({
            "0-load_1": {"ev": ["EV_0"], "cs": ["CS_0"], "controller": ""},
            "0-load_2": {"pv": ["PV_0"], "controller": "HEMS_0"},
            "0-load_3": {"pv": [], "controller": null}
        }))?;

        let gcps = config.iter().collect::<Vec<_>>();
        assert_eq!(gcps.len(), 3);
        assert_eq!(gcps[0].1, &gcp(&[("ev", &["EV_0"]), ("cs", &["CS_0"])], None));
        assert_eq!(gcps[1].1, &gcp(&[("pv", &["PV_0"])], Some("HEMS_0")));
        assert_eq!(gcps[2].1.controller, None);

        assert!(GcpConfig::from_json(&json!({"0-load_1": {"pv": "PV_0"}})).is_err_and(|e| e
            == Error::invalid_connection_config(
                "pv of GCP 0-load_1 must be a list of entity ids."
            )));
        assert!(GcpConfig::from_json(&json!({"0-load_1": {"controller": 3}}))
            .is_err_and(|e| e.kind() == ErrorKind::InvalidConnectionConfig));
        assert!(GcpConfig::from_json(&json!([]))
            .is_err_and(|e| e.kind() == ErrorKind::InvalidConnectionConfig));

        assert_eq!(GcpConfig::from_json(&config.to_json())?, config);

        Ok(())
    }

    #[test]
    fn test_station_with_vehicle_at_gcp() -> Result<(), Error> {
        let (mut scenario, cs, ev) = ev_scenario();
        let load = scenario.grid_load("0-load_1");
        let mut gcps = GcpConfig::new();
        gcps.insert(
            "0-load_1",
            gcp(&[("ev", &["EV_0"]), ("cs", &["CS_0"])], None),
        );

        let topology = scenario.build_grid_topology(&gcps)?;

        assert_eq!(
            topology.link(cs.full_id(), load.full_id()).map(|l| l.attributes()),
            Some(&[AttrLink::renamed("p", "p_mw")][..])
        );
        assert!(topology.link(ev.full_id(), load.full_id()).is_none());
        assert_eq!(
            topology.link(cs.full_id(), ev.full_id()).map(|l| l.strength()),
            Some(&Strength::Strong)
        );
        assert!(topology
            .link(ev.full_id(), cs.full_id())
            .is_some_and(|l| l.strength().is_weak()));

        Ok(())
    }

    #[test]
    fn test_missing_charging_station() {
        let (mut scenario, _, _) = ev_scenario();
        scenario.grid_load("gcp_1");
        let mut gcps = GcpConfig::new();
        gcps.insert("gcp_1", gcp(&[("ev", &["EV_0"]), ("cs", &[])], None));

        assert!(scenario.build_grid_topology(&gcps).is_err_and(|e| e
            == Error::missing_charging_station(
                "GCP gcp_1 has vehicles but no charging station."
            )));
    }

    #[test]
    fn test_multiple_primary_occupants() {
        let mut scenario = ScenarioBuilder::new();
        scenario.pv("PV_0");
        scenario.battery("BAT_0");
        scenario.grid_load("gcp_1");
        scenario
            .connect("pv", GRID_LOAD, ["p"])
            .connect("battery", GRID_LOAD, ["p"]);
        let mut gcps = GcpConfig::new();
        gcps.insert("gcp_1", gcp(&[("pv", &["PV_0"]), ("bss", &["BAT_0"])], None));

        assert!(scenario.build_grid_topology(&gcps).is_err_and(|e| e
            == Error::multiple_primary_occupants(
                "gcp_1 can't be connected to both PV_0 and BAT_0."
            )));
    }

    #[test]
    fn test_unknown_entity_reference() {
        let (mut scenario, _, _) = ev_scenario();
        scenario.grid_load("gcp_1");
        let mut gcps = GcpConfig::new();
        gcps.insert("gcp_1", gcp(&[("cs", &["CS_0", "CS_7"])], None));

        assert!(scenario.build_grid_topology(&gcps).is_err_and(|e| e
            == Error::unknown_entity_reference(
                "Entity CS_7 is configured at GCP gcp_1 but was not created."
            )));

        let mut gcps = GcpConfig::new();
        gcps.insert("gcp_1", gcp(&[("cs", &["CS_0"])], Some("HEMS_7")));
        assert!(scenario
            .build_grid_topology(&gcps)
            .is_err_and(|e| e.kind() == ErrorKind::UnknownEntityReference));
    }

    #[test]
    fn test_missing_load_is_skipped() -> Result<(), Error> {
        let (mut scenario, cs, _) = ev_scenario();
        let load = scenario.grid_load("gcp_2");
        let mut gcps = GcpConfig::new();
        gcps.insert("gcp_1", gcp(&[("cs", &["CS_0"]), ("ev", &["EV_0"])], None));
        gcps.insert("gcp_2", gcp(&[("cs", &["CS_0"])], None));

        let topology = scenario.build_grid_topology(&gcps)?;

        // Nothing is wired for gcp_1, but gcp_2 still is.
        assert_eq!(topology.links().count(), 1);
        assert!(topology.link(cs.full_id(), load.full_id()).is_some());

        Ok(())
    }

    #[test]
    fn test_unoccupied_load() -> Result<(), Error> {
        let (mut scenario, _, _) = ev_scenario();
        scenario.pv("PV_0");
        scenario.grid_load("gcp_1");
        let mut gcps = GcpConfig::new();
        gcps.insert("gcp_1", gcp(&[("pv", &["PV_0"])], None));

        let topology = scenario.build_grid_topology(&gcps)?;
        assert_eq!(topology.links().count(), 0);

        scenario.config().reject_unoccupied_grid_loads = true;
        assert!(scenario.build_grid_topology(&gcps).is_err_and(|e| e
            == Error::invalid_topology("No entity connected to grid at gcp_1.")));

        Ok(())
    }

    #[test]
    fn test_controller_occupies_gcp() -> Result<(), Error> {
        let mut scenario = ScenarioBuilder::new();
        let hems = scenario.hems("HEMS_0");
        let pv = scenario.pv("PV_0");
        let battery = scenario.battery("BAT_0");
        let load = scenario.grid_load("gcp_1");
        scenario
            .connect("HEMS_default", GRID_LOAD, ["p_balance"])
            // Ignored, the controller occupies the GCP.
            .connect("pv", GRID_LOAD, ["p"])
            .connect("battery", GRID_LOAD, ["p"]);
        for device in ["pv", "battery"] {
            scenario
                .connect(device, "HEMS_default", ["p"])
                .connect("HEMS_default", device, ["p_set"]);
        }
        let mut gcps = GcpConfig::new();
        gcps.insert(
            "gcp_1",
            gcp(&[("pv", &["PV_0"]), ("bss", &["BAT_0"])], Some("HEMS_0")),
        );

        let topology = scenario.build_grid_topology(&gcps)?;

        assert!(topology.link(hems.full_id(), load.full_id()).is_some());
        assert!(topology.link(pv.full_id(), load.full_id()).is_none());
        assert!(topology.link(battery.full_id(), load.full_id()).is_none());
        assert!(topology.link(pv.full_id(), hems.full_id()).is_some());
        assert!(topology.link(hems.full_id(), battery.full_id()).is_some());
        assert_eq!(
            topology
                .controlled_entities(hems.full_id())
                .map(|set| set.keys().map(String::as_str).collect::<Vec<_>>()),
            Some(vec!["PV_0", "BAT_0"])
        );

        Ok(())
    }

    #[test]
    fn test_grid_stage_agrees_with_planning_stage() -> Result<(), Error> {
        let mut scenario = ScenarioBuilder::new();
        let pv = scenario.pv("PV_0");
        let battery = scenario.battery("BAT_0");
        let load = scenario.grid_load("gcp_1");
        scenario
            .connect("pv", "battery", ["p_out"])
            .connect("battery", "pv", ["soc"])
            .connect("battery", GRID_LOAD, ["p"]);
        let gcps = GcpConfig::from_json(&json!({
            "gcp_1": {"bss": ["BAT_0"], "pv": ["PV_0"], "controller": ""}
        }))?;
        let grid = GridComponents::from_entities(scenario.entities().values().flatten());

        let mut builder = scenario.builder();
        builder
            .connect_entities(scenario.entities())?
            .connect_grid(&grid, &gcps, scenario.entities())?;
        let topology = builder.build()?;

        assert_eq!(
            topology.link(pv.full_id(), battery.full_id()).map(|l| l.strength()),
            Some(&Strength::Strong)
        );
        assert!(topology
            .link(battery.full_id(), pv.full_id())
            .is_some_and(|l| l.strength().is_weak()));
        assert!(topology.link(battery.full_id(), load.full_id()).is_some());
        assert_eq!(topology.links().count(), 3);

        Ok(())
    }

    #[test]
    fn test_grid_controller() -> Result<(), Error> {
        let mut scenario = ScenarioBuilder::new();
        let grid_ems = scenario.grid_ems("GridEMS_0");
        let grid = scenario.grid();
        scenario.grid_load("gcp_1");
        scenario.connect("Grid", "GridEMS", ["grid_status", "ptdf_mat", "vpif_mat"]);

        let topology = scenario.build_grid_topology(&GcpConfig::new())?;

        let link = topology.link(grid.full_id(), grid_ems.full_id()).unwrap();
        assert_eq!(link.attributes().len(), 3);
        assert_eq!(link.strength(), &Strength::Strong);
        assert_eq!(topology.links().count(), 1);

        Ok(())
    }
}
