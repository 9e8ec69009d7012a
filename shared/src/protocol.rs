use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::boat::{BoatState, ControlInput};
use crate::config::EnvironmentConfig;
use crate::environment::{EnvironmentSnapshot, EnvironmentUpdate};
use crate::vec3::{Quat, Vec3};

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "player_id")]
    PlayerId(PlayerIdMsg),
    #[serde(rename = "game_state")]
    GameState(GameStateMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PlayerIdMsg {
    pub id: u32,
    pub protocol_version: u32,
    pub config: EnvironmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct GameStateMsg {
    pub boats: Vec<BoatWire>,
    pub environment: EnvironmentSnapshot,
    pub race_started: bool,
    pub race_finished: bool,
    pub race_time: f64,
}

/// One roster entry: the last boat update of a player plus its display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct BoatWire {
    pub name: String,
    #[serde(flatten)]
    pub state: BoatState,
    #[serde(default)]
    pub controls: Option<ControlInput>,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "player_join")]
    PlayerJoin { name: String },
    #[serde(rename = "boat_update")]
    BoatUpdate(BoatUpdateMsg),
}

/// Boat pose from its owner. The sender id comes from the connection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct BoatUpdateMsg {
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
    pub speed: f64,
    #[serde(default)]
    pub controls: Option<ControlInput>,
}

impl BoatUpdateMsg {
    pub fn from_state(state: &BoatState, controls: Option<ControlInput>) -> Self {
        Self {
            position: state.position,
            orientation: state.orientation,
            velocity: state.velocity,
            speed: state.speed,
            controls,
        }
    }

    /// Boat state attributed to `id`. Non-finite components are zeroed.
    pub fn to_state(&self, id: u32) -> BoatState {
        let v = |v: Vec3| Vec3::new(finite(v.x), finite(v.y), finite(v.z));
        let q = self.orientation;
        let orientation = if [q.x, q.y, q.z, q.w].iter().all(|c| c.is_finite()) {
            q
        } else {
            Quat::IDENTITY
        };
        BoatState {
            id,
            position: v(self.position),
            orientation,
            velocity: v(self.velocity),
            speed: finite(self.speed),
        }
    }
}

// === Client-side lenient view ===

/// What a client reads from the server. Every `game_state` field is optional
/// so partial payloads only touch the fields they carry.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMsg {
    #[serde(rename = "player_id")]
    PlayerId(PlayerIdMsg),
    #[serde(rename = "game_state")]
    GameState(GameStateUpdate),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameStateUpdate {
    pub boats: Option<Vec<BoatWire>>,
    pub environment: Option<EnvironmentUpdate>,
    pub race_started: Option<bool>,
    pub race_finished: Option<bool>,
    pub race_time: Option<f64>,
}

// === Conversion helpers ===

fn finite(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Round to 4 decimal places (plenty for metres and unit quaternions, halves JSON size)
#[inline]
pub fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}
