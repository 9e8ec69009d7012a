//! Stochastic wind process.
//!
//! Direction and speed wander through per-tick Bernoulli trials whose
//! probability scales with the tick length, so the statistics do not depend
//! on frame rate. The decomposed vector is recomputed on every mutation.

use crate::vec3::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Speed band the stochastic process stays in (m/s)
pub const DRIFT_MIN_SPEED: f64 = 1.0;
pub const DRIFT_MAX_SPEED: f64 = 15.0;
/// Wider band accepted from authoritative overrides (m/s)
pub const OVERRIDE_MAX_SPEED: f64 = 30.0;

const DIRECTION_NUDGE_DEG: f64 = 5.0;
const SPEED_NUDGE: f64 = 1.0;
/// Gust trials per second
const GUST_RATE: f64 = 0.1;

/// Wind state as broadcast. `x`/`z` always match `direction`/`speed`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct Wind {
    direction: f64,
    speed: f64,
    x: f64,
    z: f64,
    gust_factor: f64,
    change_rate: f64,
}

impl Wind {
    pub fn new(direction: f64, speed: f64, gust_factor: f64, change_rate: f64) -> Self {
        let mut wind = Self {
            direction: normalize_degrees(direction),
            speed,
            x: 0.0,
            z: 0.0,
            gust_factor,
            change_rate,
        };
        wind.recompute_vector();
        wind
    }

    pub fn direction(&self) -> f64 {
        self.direction
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn gust_factor(&self) -> f64 {
        self.gust_factor
    }

    pub fn change_rate(&self) -> f64 {
        self.change_rate
    }

    fn recompute_vector(&mut self) {
        let rad = self.direction.to_radians();
        self.x = -rad.sin() * self.speed;
        self.z = -rad.cos() * self.speed;
    }
}

/// Partial wind override; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase", default)]
pub struct WindOverride {
    pub direction: Option<f64>,
    pub speed: Option<f64>,
    pub gust_factor: Option<f64>,
    pub change_rate: Option<f64>,
}

impl From<&Wind> for WindOverride {
    fn from(wind: &Wind) -> Self {
        Self {
            direction: Some(wind.direction),
            speed: Some(wind.speed),
            gust_factor: Some(wind.gust_factor),
            change_rate: Some(wind.change_rate),
        }
    }
}

/// Wrap an angle in degrees into [0, 360).
pub fn normalize_degrees(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Uniform sample in [-half_width, half_width]; zero width yields zero.
fn symmetric(rng: &mut impl Rng, half_width: f64) -> f64 {
    (rng.gen::<f64>() * 2.0 - 1.0) * half_width
}

#[derive(Debug, Clone)]
pub struct WindModel {
    wind: Wind,
}

impl WindModel {
    pub fn new(wind: Wind) -> Self {
        Self { wind }
    }

    pub fn wind(&self) -> &Wind {
        &self.wind
    }

    /// Decomposed wind vector `(x, 0, z)`.
    pub fn vector(&self) -> Vec3 {
        Vec3::new(self.wind.x, 0.0, self.wind.z)
    }

    /// Advance the stochastic process by `delta_time` seconds.
    /// Returns true if direction or speed changed.
    pub fn update(&mut self, delta_time: f64, rng: &mut impl Rng) -> bool {
        let mut changed = false;
        let w = &mut self.wind;

        if rng.gen::<f64>() < w.change_rate * delta_time {
            w.direction = normalize_degrees(w.direction + symmetric(rng, DIRECTION_NUDGE_DEG));
            w.speed = (w.speed + symmetric(rng, SPEED_NUDGE)).clamp(DRIFT_MIN_SPEED, DRIFT_MAX_SPEED);
            changed = true;
        }

        if rng.gen::<f64>() < GUST_RATE * delta_time {
            let gust = symmetric(rng, w.gust_factor) * w.speed;
            w.speed = (w.speed + gust).clamp(DRIFT_MIN_SPEED, DRIFT_MAX_SPEED);
            changed = true;
        }

        if changed {
            w.recompute_vector();
        }
        changed
    }

    /// Apply an authoritative override field by field.
    pub fn set_wind(&mut self, update: &WindOverride) {
        let w = &mut self.wind;
        if let Some(direction) = update.direction.filter(|d| d.is_finite()) {
            w.direction = normalize_degrees(direction);
        }
        if let Some(speed) = update.speed.filter(|s| s.is_finite()) {
            w.speed = speed.clamp(0.0, OVERRIDE_MAX_SPEED);
        }
        if let Some(gust_factor) = update.gust_factor.filter(|g| g.is_finite()) {
            w.gust_factor = gust_factor.max(0.0);
        }
        if let Some(change_rate) = update.change_rate.filter(|c| c.is_finite()) {
            w.change_rate = change_rate.max(0.0);
        }
        w.recompute_vector();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    fn assert_vector_matches(wind: &Wind) {
        let rad = wind.direction().to_radians();
        assert!((wind.x() - (-rad.sin() * wind.speed())).abs() < 1e-9);
        assert!((wind.z() - (-rad.cos() * wind.speed())).abs() < 1e-9);
    }

    #[test]
    fn vector_matches_direction_and_speed_after_every_update() {
        let mut model = WindModel::new(Wind::new(90.0, 8.0, 0.3, 2.0));
        let mut rng = test_rng();
        let mut changes = 0;
        for _ in 0..2000 {
            if model.update(0.05, &mut rng) {
                changes += 1;
            }
            assert_vector_matches(model.wind());
            let v = model.vector();
            assert_eq!(v.y, 0.0);
            assert_eq!(v.x, model.wind().x());
        }
        assert!(changes > 0, "process should have mutated at least once");
    }

    #[test]
    fn north_wind_blows_south() {
        let wind = Wind::new(0.0, 10.0, 0.0, 0.0);
        assert!(wind.x().abs() < 1e-9);
        assert!((wind.z() + 10.0).abs() < 1e-9);
    }

    #[test]
    fn stochastic_speed_stays_in_drift_band() {
        let mut model = WindModel::new(Wind::new(0.0, 14.5, 1.0, 5.0));
        let mut rng = test_rng();
        for _ in 0..5000 {
            model.update(0.1, &mut rng);
            let s = model.wind().speed();
            assert!((DRIFT_MIN_SPEED..=DRIFT_MAX_SPEED).contains(&s), "speed {}", s);
            let d = model.wind().direction();
            assert!((0.0..360.0).contains(&d), "direction {}", d);
        }
    }

    #[test]
    fn zero_delta_never_mutates() {
        let mut model = WindModel::new(Wind::new(10.0, 5.0, 0.5, 100.0));
        let mut rng = test_rng();
        for _ in 0..100 {
            assert!(!model.update(0.0, &mut rng));
        }
        assert_eq!(model.wind().direction(), 10.0);
    }

    #[test]
    fn set_wind_applies_only_present_fields() {
        let mut model = WindModel::new(Wind::new(10.0, 5.0, 0.2, 0.1));
        model.set_wind(&WindOverride {
            speed: Some(12.0),
            ..Default::default()
        });
        assert_eq!(model.wind().direction(), 10.0);
        assert_eq!(model.wind().speed(), 12.0);
        assert_eq!(model.wind().gust_factor(), 0.2);
        assert_vector_matches(model.wind());
    }

    #[test]
    fn set_wind_normalizes_and_clamps() {
        let mut model = WindModel::new(Wind::new(0.0, 5.0, 0.2, 0.1));
        model.set_wind(&WindOverride {
            direction: Some(-30.0),
            speed: Some(50.0),
            ..Default::default()
        });
        assert!((model.wind().direction() - 330.0).abs() < 1e-9);
        assert_eq!(model.wind().speed(), OVERRIDE_MAX_SPEED);
        assert_vector_matches(model.wind());

        model.set_wind(&WindOverride {
            direction: Some(725.0),
            speed: Some(-3.0),
            ..Default::default()
        });
        assert!((model.wind().direction() - 5.0).abs() < 1e-9);
        assert_eq!(model.wind().speed(), 0.0);
        assert_vector_matches(model.wind());
    }

    #[test]
    fn normalize_degrees_wraps_into_range() {
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert!((normalize_degrees(-1.0) - 359.0).abs() < 1e-9);
        assert!(normalize_degrees(-1e-20) < 360.0);
    }

    #[test]
    fn partial_override_deserializes_from_sparse_json() {
        let update: WindOverride = serde_json::from_str(r#"{"direction":180}"#).unwrap();
        assert_eq!(update.direction, Some(180.0));
        assert_eq!(update.speed, None);
    }
}
