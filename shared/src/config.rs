/// Storage precision of height-field texels.
///
/// `Fixed` stands in for hardware without float render targets: every written
/// component is quantized, and the simulation keeps running with the lost precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "lowercase")]
pub enum TexelFormat {
    Float,
    Fixed,
}

/// Environment configuration, shared by server and clients so both sides
/// agree on the water extents and the initial weather.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    /// Edge length of the simulated water square in world units, centred at the origin
    pub water_size: f64,
    /// Height-field texels per side
    pub resolution: u32,
    pub texel_format: TexelFormat,

    /// Initial wind direction (degrees, the direction the wind blows from)
    pub wind_direction: f64,
    /// Initial wind speed (m/s)
    pub wind_speed: f64,
    pub gust_factor: f64,
    /// Expected direction/speed nudges per second
    pub change_rate: f64,

    pub wave_amplitude: f64,
    pub wave_frequency: f64,
    pub wave_direction: f64,
    pub wave_speed: f64,

    /// Boats slower than this leave no wake (m/s)
    pub wake_min_speed: f64,
    /// Boats faster than this also leave trailing drops (m/s)
    pub wake_trail_speed: f64,

    pub rng_seed: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            water_size: 1000.0,
            resolution: 128,
            texel_format: TexelFormat::Float,
            wind_direction: 45.0,
            wind_speed: 5.0,
            gust_factor: 0.2,
            change_rate: 0.1,
            wave_amplitude: 0.5,
            wave_frequency: 0.1,
            wave_direction: 45.0,
            wave_speed: 1.0,
            wake_min_speed: 0.5,
            wake_trail_speed: 5.0,
            rng_seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be {requirement}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
    },
}

fn require(ok: bool, field: &'static str, requirement: &'static str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, requirement })
    }
}

impl EnvironmentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require(
            self.water_size.is_finite() && self.water_size > 0.0,
            "water_size",
            "finite and > 0",
        )?;
        require(
            (4..=2048).contains(&self.resolution),
            "resolution",
            "between 4 and 2048",
        )?;
        require(
            self.wind_direction.is_finite(),
            "wind_direction",
            "finite",
        )?;
        require(
            self.wind_speed.is_finite() && (0.0..=30.0).contains(&self.wind_speed),
            "wind_speed",
            "within [0, 30]",
        )?;
        require(
            self.gust_factor.is_finite() && (0.0..=1.0).contains(&self.gust_factor),
            "gust_factor",
            "within [0, 1]",
        )?;
        require(
            self.change_rate.is_finite() && self.change_rate >= 0.0,
            "change_rate",
            "finite and >= 0",
        )?;
        require(
            self.wave_amplitude.is_finite() && self.wave_amplitude >= 0.0,
            "wave_amplitude",
            "finite and >= 0",
        )?;
        require(
            self.wave_frequency.is_finite() && self.wave_frequency > 0.0,
            "wave_frequency",
            "finite and > 0",
        )?;
        require(
            self.wave_direction.is_finite() && self.wave_speed.is_finite(),
            "wave_direction/wave_speed",
            "finite",
        )?;
        require(
            self.wake_min_speed.is_finite() && self.wake_min_speed >= 0.0,
            "wake_min_speed",
            "finite and >= 0",
        )?;
        require(
            self.wake_trail_speed.is_finite() && self.wake_trail_speed >= self.wake_min_speed,
            "wake_trail_speed",
            "finite and >= wake_min_speed",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_config_is_valid() {
        assert!(EnvironmentConfig::default().validate().is_ok());
    }

    #[test]
    fn trail_speed_below_min_speed_invalid() {
        let config = EnvironmentConfig {
            wake_min_speed: 4.0,
            wake_trail_speed: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_resolution_invalid() {
        let config = EnvironmentConfig {
            resolution: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().starts_with("resolution"));
    }

    #[test]
    fn texel_format_serializes_lowercase() {
        let json = serde_json::to_string(&TexelFormat::Fixed).unwrap();
        assert_eq!(json, "\"fixed\"");
    }
}
