//! Environment orchestration.
//!
//! [`Environment`] is the replicated part (wind and waves) that the server
//! owns authoritatively. [`EnvironmentController`] is the client-side driver
//! that adds the local height-field water and boat wakes on top of it.

use crate::boat::{BoatState, WaterQuery};
use crate::config::EnvironmentConfig;
use crate::heightfield::HeightFieldSimulator;
use crate::vec3::Vec3;
use crate::wake::WakeEmitter;
use crate::waves::{WaveBase, WaveSpectrum, WavesOverride, WavesSnapshot};
use crate::wind::{Wind, WindModel, WindOverride};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Serializable wind and wave state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct EnvironmentSnapshot {
    pub wind: Wind,
    pub waves: WavesSnapshot,
}

/// Authoritative environment values. Present fields replace local values,
/// absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(default)]
pub struct EnvironmentUpdate {
    pub wind: Option<WindOverride>,
    pub waves: Option<WavesOverride>,
}

impl From<EnvironmentSnapshot> for EnvironmentUpdate {
    fn from(snapshot: EnvironmentSnapshot) -> Self {
        Self {
            wind: Some(WindOverride::from(&snapshot.wind)),
            waves: Some(WavesOverride::from(snapshot.waves)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Environment {
    wind: WindModel,
    waves: WaveSpectrum,
    time: f64,
}

impl Environment {
    pub fn new(config: &EnvironmentConfig, rng: &mut impl Rng) -> Self {
        let wind = WindModel::new(Wind::new(
            config.wind_direction,
            config.wind_speed,
            config.gust_factor,
            config.change_rate,
        ));
        let base = WaveBase {
            amplitude: config.wave_amplitude,
            frequency: config.wave_frequency,
            direction: config.wave_direction,
            speed: config.wave_speed,
        };
        Self {
            wind,
            waves: WaveSpectrum::new(base, rng),
            time: 0.0,
        }
    }

    pub fn wind(&self) -> &WindModel {
        &self.wind
    }

    pub fn waves(&self) -> &WaveSpectrum {
        &self.waves
    }

    pub fn waves_mut(&mut self) -> &mut WaveSpectrum {
        &mut self.waves
    }

    /// Seconds of simulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Advance wind, then waves with the updated wind.
    pub fn update(&mut self, delta_time: f64, rng: &mut impl Rng) {
        self.time += delta_time;
        self.wind.update(delta_time, rng);
        self.waves.update(delta_time, self.wind.wind());
    }

    pub fn set_wind(&mut self, update: &WindOverride) {
        self.wind.set_wind(update);
    }

    pub fn set_waves(&mut self, update: &WavesOverride, rng: &mut impl Rng) {
        self.waves.set_waves(update, rng);
    }

    pub fn apply(&mut self, update: &EnvironmentUpdate, rng: &mut impl Rng) {
        if let Some(wind) = &update.wind {
            self.set_wind(wind);
        }
        if let Some(waves) = &update.waves {
            self.set_waves(waves, rng);
        }
    }

    pub fn wave_height_at(&self, x: f64, z: f64) -> f64 {
        self.waves.height_at(x, z, self.time)
    }

    pub fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            wind: *self.wind.wind(),
            waves: self.waves.snapshot(),
        }
    }
}

/// Client-side environment driver, run once per frame.
pub struct EnvironmentController {
    environment: Environment,
    water: HeightFieldSimulator,
    wake: WakeEmitter,
    rng: ChaCha8Rng,
}

impl EnvironmentController {
    pub fn new(config: &EnvironmentConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        Self {
            environment: Environment::new(config, &mut rng),
            water: HeightFieldSimulator::from_config(config),
            wake: WakeEmitter::from_config(config),
            rng,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn water(&self) -> &HeightFieldSimulator {
        &self.water
    }

    /// Direct access for ambient disturbances injected by the scene.
    pub fn water_mut(&mut self) -> &mut HeightFieldSimulator {
        &mut self.water
    }

    /// One frame: wind, waves, one height-field tick, then the local boat's wake.
    pub fn update(
        &mut self,
        delta_time: f64,
        local_boat: Option<&BoatState>,
    ) -> EnvironmentSnapshot {
        self.environment.update(delta_time, &mut self.rng);
        self.water.step();
        self.water.recompute_normals();
        if let Some(boat) = local_boat {
            self.wake.emit(boat, &mut self.water);
        }
        self.environment.snapshot()
    }

    /// Adopt authoritative values from the server, field by field.
    pub fn handle_server_update(&mut self, update: &EnvironmentUpdate) {
        tracing::debug!(
            wind = update.wind.is_some(),
            waves = update.waves.is_some(),
            "Applying server environment"
        );
        self.environment.apply(update, &mut self.rng);
    }

    pub fn set_wind(&mut self, update: &WindOverride) {
        self.environment.set_wind(update);
    }

    pub fn set_waves(&mut self, update: &WavesOverride) {
        self.environment.set_waves(update, &mut self.rng);
    }

    pub fn snapshot(&self) -> EnvironmentSnapshot {
        self.environment.snapshot()
    }

    /// Release the height-field buffers.
    pub fn dispose(&mut self) {
        self.water.dispose();
    }
}

impl WaterQuery for EnvironmentController {
    fn wind_vector(&self) -> Vec3 {
        self.environment.wind().vector()
    }

    fn water_height_at(&self, x: f64, z: f64) -> f64 {
        self.environment.wave_height_at(x, z) + self.water.height_at_world(x, z)
    }
}
