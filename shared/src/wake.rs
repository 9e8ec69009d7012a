//! Boat wakes as height-field drops.
//!
//! No wake below `min_speed`. Above it one drop at the boat, scaled by speed;
//! above `trail_speed` two smaller, weaker drops also trail behind the boat.

use crate::boat::BoatState;
use crate::config::EnvironmentConfig;
use crate::heightfield::{in_unit_square, HeightFieldSimulator};
use crate::vec3::{normalize, Vec3};

/// Speed at which the main drop reaches full strength (m/s)
const FULL_STRENGTH_SPEED: f64 = 10.0;
/// Drop radius in surface units at standstill, and its growth per m/s
const BASE_RADIUS: f64 = 0.02;
const RADIUS_PER_SPEED: f64 = 0.0005;
/// World distance between successive trailing drops
const TRAIL_SPACING: f64 = 4.0;
const TRAIL_DROPS: usize = 2;
const TRAIL_RADIUS_SCALE: f64 = 0.7;
const TRAIL_STRENGTH_SCALE: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct WakeEmitter {
    min_speed: f64,
    trail_speed: f64,
}

impl WakeEmitter {
    pub fn new(min_speed: f64, trail_speed: f64) -> Self {
        Self {
            min_speed,
            trail_speed,
        }
    }

    pub fn from_config(config: &EnvironmentConfig) -> Self {
        Self::new(config.wake_min_speed, config.wake_trail_speed)
    }

    /// Inject the wake for one tick. Returns the number of drops added.
    pub fn emit(&self, boat: &BoatState, water: &mut HeightFieldSimulator) -> usize {
        if boat.speed.is_nan() || boat.speed < self.min_speed {
            return 0;
        }
        let (u, v) = water.world_to_uv(boat.position.x, boat.position.z);
        if !in_unit_square(u, v) {
            return 0;
        }

        let strength = (boat.speed / FULL_STRENGTH_SPEED).min(1.0);
        let radius = BASE_RADIUS + boat.speed * RADIUS_PER_SPEED;
        water.add_drop(u, v, radius, strength);
        let mut drops = 1;

        if boat.speed > self.trail_speed {
            let heading = heading_on_water(boat);
            for i in 1..=TRAIL_DROPS {
                let back = TRAIL_SPACING * i as f64;
                let (tu, tv) = water.world_to_uv(
                    boat.position.x - heading.x * back,
                    boat.position.z - heading.z * back,
                );
                if in_unit_square(tu, tv) {
                    water.add_drop(
                        tu,
                        tv,
                        radius * TRAIL_RADIUS_SCALE,
                        strength * TRAIL_STRENGTH_SCALE,
                    );
                    drops += 1;
                }
            }
        }
        drops
    }
}

/// Forward direction flattened onto the water plane, falling back to the
/// velocity when the hull points straight up or down.
fn heading_on_water(boat: &BoatState) -> Vec3 {
    let f = boat.orientation.forward();
    let flat = Vec3::new(f.x, 0.0, f.z);
    if flat.x.abs() + flat.z.abs() > 1e-6 {
        return normalize(flat);
    }
    normalize(Vec3::new(boat.velocity.x, 0.0, boat.velocity.z))
}
