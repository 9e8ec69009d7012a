//! Boat-side contracts.
//!
//! Boat dynamics live outside the environment core. The core only reads a
//! [`BoatState`] each tick and answers wind and water-height queries.

use crate::vec3::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Kinematic boat state as published by boat dynamics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct BoatState {
    pub id: u32,
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
    /// Speed over water (m/s)
    pub speed: f64,
}

/// Helm and sail controls sampled from the input layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ControlInput {
    pub rudder_angle: f64,
    pub throttle: f64,
    pub sail_angle: f64,
    pub trim: f64,
}

/// Environment queries boat dynamics may make every tick.
pub trait WaterQuery {
    /// Wind vector `(x, 0, z)` in m/s
    fn wind_vector(&self) -> Vec3;
    /// Water surface height at world `(x, z)`
    fn water_height_at(&self, x: f64, z: f64) -> f64;
}

/// Produces the control vector at the client's polling cadence.
pub trait ControlSource {
    fn sample(&mut self) -> ControlInput;
}

/// Integrates one boat. Implemented outside this crate.
pub trait BoatDynamics {
    fn update(&mut self, delta_time: f64, controls: &ControlInput, water: &dyn WaterQuery);
    fn state(&self) -> &BoatState;
}
