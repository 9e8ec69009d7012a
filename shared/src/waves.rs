//! Additive sinusoidal wave spectrum.
//!
//! A fixed set of components is derived from a nominal base. The nominal
//! amplitude follows the wind through a slow first-order filter, component
//! phases advance with time and component headings relax toward the nominal
//! heading. Evolution continues while the spectrum is inactive; only height
//! queries are muted.

use crate::wind::{normalize_degrees, Wind};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use ts_rs::TS;

/// Components per spectrum, fixed for the spectrum's lifetime
pub const WAVE_COMPONENT_COUNT: usize = 5;

/// Per-update pull of the nominal amplitude toward `wind.speed * WIND_TO_AMPLITUDE`.
/// Applied once per call, independent of the tick length.
const AMPLITUDE_SMOOTHING: f64 = 0.01;
const WIND_TO_AMPLITUDE: f64 = 0.1;
const DIRECTION_SMOOTHING: f64 = 0.01;
const DIRECTION_SPREAD_DEG: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WaveComponent {
    pub amplitude: f64,
    pub frequency: f64,
    /// Degrees in [0, 360)
    pub direction: f64,
    /// Radians in [0, 2π)
    pub phase: f64,
    pub speed: f64,
}

impl WaveComponent {
    /// Finite everywhere with a positive frequency.
    fn is_valid(&self) -> bool {
        self.amplitude.is_finite()
            && self.frequency.is_finite()
            && self.frequency > 0.0
            && self.direction.is_finite()
            && self.phase.is_finite()
            && self.speed.is_finite()
    }

    fn height_at(&self, x: f64, z: f64, time: f64) -> f64 {
        let rad = self.direction.to_radians();
        let along = x * rad.cos() + z * rad.sin();
        self.amplitude * (along * self.frequency + time * self.speed + self.phase).sin()
    }
}

/// Nominal spectrum parameters components are derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WaveBase {
    pub amplitude: f64,
    pub frequency: f64,
    pub direction: f64,
    pub speed: f64,
}

/// Full wave state as broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WavesSnapshot {
    pub amplitude: f64,
    pub frequency: f64,
    pub direction: f64,
    pub speed: f64,
    pub is_active: bool,
    pub components: Vec<WaveComponent>,
}

/// Partial wave override. Without `components` a fresh randomized set is
/// derived from the (updated) nominal parameters, which resets phases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase", default)]
pub struct WavesOverride {
    pub amplitude: Option<f64>,
    pub frequency: Option<f64>,
    pub direction: Option<f64>,
    pub speed: Option<f64>,
    pub is_active: Option<bool>,
    pub components: Option<Vec<WaveComponent>>,
}

impl From<WavesSnapshot> for WavesOverride {
    fn from(s: WavesSnapshot) -> Self {
        Self {
            amplitude: Some(s.amplitude),
            frequency: Some(s.frequency),
            direction: Some(s.direction),
            speed: Some(s.speed),
            is_active: Some(s.is_active),
            components: Some(s.components),
        }
    }
}

/// Signed shortest rotation from `from` to `to`, in degrees within [-180, 180).
fn angle_delta(from: f64, to: f64) -> f64 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}

#[derive(Debug, Clone)]
pub struct WaveSpectrum {
    base: WaveBase,
    components: Vec<WaveComponent>,
    is_active: bool,
}

impl WaveSpectrum {
    pub fn new(base: WaveBase, rng: &mut impl Rng) -> Self {
        let mut spectrum = Self {
            base,
            components: Vec::with_capacity(WAVE_COMPONENT_COUNT),
            is_active: true,
        };
        spectrum.init_components(base, rng);
        spectrum
    }

    pub fn base(&self) -> &WaveBase {
        &self.base
    }

    pub fn components(&self) -> &[WaveComponent] {
        &self.components
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    /// Re-populate the components from `base`.
    pub fn init_components(&mut self, base: WaveBase, rng: &mut impl Rng) {
        self.components.clear();
        for _ in 0..WAVE_COMPONENT_COUNT {
            let spread = rng.gen_range(-DIRECTION_SPREAD_DEG..=DIRECTION_SPREAD_DEG);
            self.components.push(WaveComponent {
                amplitude: base.amplitude * rng.gen_range(0.2..=1.0),
                frequency: base.frequency * rng.gen_range(0.5..=2.0),
                direction: normalize_degrees(base.direction + spread),
                phase: rng.gen_range(0.0..TAU),
                speed: base.speed * rng.gen_range(0.8..=1.2),
            });
        }
    }

    pub fn update(&mut self, delta_time: f64, wind: &Wind) {
        let target = wind.speed() * WIND_TO_AMPLITUDE;
        self.base.amplitude += (target - self.base.amplitude) * AMPLITUDE_SMOOTHING;

        let nominal = self.base.direction;
        for c in &mut self.components {
            c.phase = (c.phase + c.speed * delta_time).rem_euclid(TAU);
            c.direction = normalize_degrees(
                c.direction + angle_delta(c.direction, nominal) * DIRECTION_SMOOTHING,
            );
        }
    }

    /// Surface displacement at world `(x, z)`; zero while inactive.
    pub fn height_at(&self, x: f64, z: f64, time: f64) -> f64 {
        if !self.is_active {
            return 0.0;
        }
        self.components.iter().map(|c| c.height_at(x, z, time)).sum()
    }

    pub fn set_waves(&mut self, update: &WavesOverride, rng: &mut impl Rng) {
        if let Some(amplitude) = update.amplitude.filter(|a| a.is_finite()) {
            self.base.amplitude = amplitude.max(0.0);
        }
        if let Some(frequency) = update.frequency.filter(|f| f.is_finite() && *f > 0.0) {
            self.base.frequency = frequency;
        }
        if let Some(direction) = update.direction.filter(|d| d.is_finite()) {
            self.base.direction = normalize_degrees(direction);
        }
        if let Some(speed) = update.speed.filter(|s| s.is_finite()) {
            self.base.speed = speed;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }

        match &update.components {
            Some(components)
                if components.len() == WAVE_COMPONENT_COUNT
                    && components.iter().all(WaveComponent::is_valid) =>
            {
                self.components = components
                    .iter()
                    .map(|c| WaveComponent {
                        amplitude: c.amplitude.max(0.0),
                        direction: normalize_degrees(c.direction),
                        phase: c.phase.rem_euclid(TAU),
                        ..*c
                    })
                    .collect();
            }
            Some(components) => {
                tracing::warn!(
                    "Ignoring wave override with {} components (expected {} valid ones)",
                    components.len(),
                    WAVE_COMPONENT_COUNT
                );
                self.init_components(self.base, rng);
            }
            None => self.init_components(self.base, rng),
        }
    }

    pub fn snapshot(&self) -> WavesSnapshot {
        WavesSnapshot {
            amplitude: self.base.amplitude,
            frequency: self.base.frequency,
            direction: self.base.direction,
            speed: self.base.speed,
            is_active: self.is_active,
            components: self.components.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn base() -> WaveBase {
        WaveBase {
            amplitude: 2.0,
            frequency: 0.3,
            direction: 90.0,
            speed: 1.5,
        }
    }

    fn spectrum(seed: u64) -> (WaveSpectrum, ChaCha8Rng) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (WaveSpectrum::new(base(), &mut rng), rng)
    }

    #[test]
    fn init_components_always_yields_five_within_ranges() {
        let (mut s, mut rng) = spectrum(1);
        for _ in 0..50 {
            s.init_components(base(), &mut rng);
            assert_eq!(s.components().len(), WAVE_COMPONENT_COUNT);
            for c in s.components() {
                assert!(c.amplitude >= 0.2 * 2.0 - 1e-12 && c.amplitude <= 2.0 + 1e-12);
                assert!(c.frequency >= 0.15 - 1e-12 && c.frequency <= 0.6 + 1e-12);
                assert!((0.0..TAU).contains(&c.phase));
                assert!(angle_delta(90.0, c.direction).abs() <= 20.0 + 1e-9);
                assert!(c.speed >= 1.2 - 1e-12 && c.speed <= 1.8 + 1e-12);
            }
        }
    }

    #[test]
    fn amplitude_relaxes_toward_wind() {
        let (mut s, _) = spectrum(2);
        let wind = Wind::new(0.0, 10.0, 0.0, 0.0);
        for _ in 0..2000 {
            s.update(0.016, &wind);
        }
        assert!((s.base().amplitude - 1.0).abs() < 1e-3);
    }

    #[test]
    fn amplitude_smoothing_ignores_delta_time() {
        // Frame-rate dependent by construction: one call moves the same amount
        // regardless of tick length.
        let (mut short, _) = spectrum(3);
        let (mut long, _) = spectrum(3);
        let wind = Wind::new(0.0, 10.0, 0.0, 0.0);
        short.update(0.001, &wind);
        long.update(1.0, &wind);
        assert_eq!(short.base().amplitude, long.base().amplitude);
        assert!((short.base().amplitude - (2.0 + (1.0 - 2.0) * 0.01)).abs() < 1e-12);
    }

    #[test]
    fn phases_advance_and_stay_wrapped() {
        let (mut s, _) = spectrum(4);
        let before: Vec<f64> = s.components().iter().map(|c| c.phase).collect();
        let wind = Wind::new(0.0, 5.0, 0.0, 0.0);
        s.update(0.1, &wind);
        for (c, p0) in s.components().iter().zip(before) {
            let expected = (p0 + c.speed * 0.1).rem_euclid(TAU);
            assert!((c.phase - expected).abs() < 1e-9);
        }
        for _ in 0..1000 {
            s.update(0.5, &wind);
        }
        assert!(s.components().iter().all(|c| (0.0..TAU).contains(&c.phase)));
    }

    #[test]
    fn directions_relax_toward_nominal() {
        let (mut s, _) = spectrum(5);
        let wind = Wind::new(0.0, 5.0, 0.0, 0.0);
        for _ in 0..3000 {
            s.update(0.016, &wind);
        }
        for c in s.components() {
            assert!(angle_delta(c.direction, 90.0).abs() < 0.01);
        }
    }

    #[test]
    fn inactive_spectrum_reads_zero_but_keeps_evolving() {
        let (mut s, _) = spectrum(6);
        s.set_active(false);
        let phase_before = s.components()[0].phase;
        s.update(0.2, &Wind::new(0.0, 5.0, 0.0, 0.0));
        assert_eq!(s.height_at(3.0, 4.0, 1.0), 0.0);
        assert_ne!(s.components()[0].phase, phase_before);
        s.set_active(true);
        let h: f64 = s.height_at(3.0, 4.0, 1.0);
        let bound: f64 = s.components().iter().map(|c| c.amplitude).sum();
        assert!(h.abs() <= bound);
    }

    #[test]
    fn set_waves_amplitude_only_keeps_frequency() {
        let (mut s, mut rng) = spectrum(7);
        let frequency = s.base().frequency;
        s.set_waves(
            &WavesOverride {
                amplitude: Some(2.5),
                ..Default::default()
            },
            &mut rng,
        );
        assert_eq!(s.snapshot().amplitude, 2.5);
        assert_eq!(s.snapshot().frequency, frequency);
        assert_eq!(s.components().len(), WAVE_COMPONENT_COUNT);
    }

    #[test]
    fn set_waves_without_components_rerandomizes_phases() {
        let (mut s, mut rng) = spectrum(8);
        let phases: Vec<f64> = s.components().iter().map(|c| c.phase).collect();
        s.set_waves(&WavesOverride::default(), &mut rng);
        let after: Vec<f64> = s.components().iter().map(|c| c.phase).collect();
        assert_ne!(phases, after);
    }

    #[test]
    fn set_waves_with_components_adopts_them() {
        let (mut s, mut rng) = spectrum(9);
        let (donor, _) = spectrum(10);
        s.set_waves(&WavesOverride::from(donor.snapshot()), &mut rng);
        assert_eq!(s.components(), donor.components());
    }

    #[test]
    fn wrong_component_count_is_rederived() {
        let (mut s, mut rng) = spectrum(11);
        let one = s.components()[0];
        s.set_waves(
            &WavesOverride {
                components: Some(vec![one]),
                ..Default::default()
            },
            &mut rng,
        );
        assert_eq!(s.components().len(), WAVE_COMPONENT_COUNT);
    }

    #[test]
    fn non_positive_frequencies_are_rederived() {
        let (mut s, mut rng) = spectrum(12);
        let json = r#"{"components":[
            {"amplitude":1,"frequency":-2,"direction":0,"phase":0,"speed":1},
            {"amplitude":1,"frequency":0,"direction":0,"phase":0,"speed":1},
            {"amplitude":1,"frequency":-2,"direction":0,"phase":0,"speed":1},
            {"amplitude":1,"frequency":-2,"direction":0,"phase":0,"speed":1},
            {"amplitude":1,"frequency":-2,"direction":0,"phase":0,"speed":1}]}"#;
        let update: WavesOverride = serde_json::from_str(json).unwrap();
        s.set_waves(&update, &mut rng);
        assert_eq!(s.components().len(), WAVE_COMPONENT_COUNT);
        assert!(s.components().iter().all(|c| c.frequency > 0.0));
    }

    #[test]
    fn non_finite_component_speed_is_rederived() {
        let (mut s, mut rng) = spectrum(13);
        let (donor, _) = spectrum(14);
        let mut update = WavesOverride::from(donor.snapshot());
        if let Some(components) = update.components.as_mut() {
            components[3].speed = f64::INFINITY;
        }
        s.set_waves(&update, &mut rng);
        assert_ne!(s.components(), donor.components());
        assert!(s.components().iter().all(|c| c.speed.is_finite()));
    }

    #[test]
    fn direction_relaxes_across_north() {
        let (mut s, mut rng) = spectrum(15);
        let north_west = WaveComponent {
            amplitude: 1.0,
            frequency: 0.3,
            direction: 350.0,
            phase: 0.0,
            speed: 1.0,
        };
        s.set_waves(
            &WavesOverride {
                direction: Some(10.0),
                components: Some(vec![north_west; WAVE_COMPONENT_COUNT]),
                ..Default::default()
            },
            &mut rng,
        );
        s.update(0.016, &Wind::new(0.0, 5.0, 0.0, 0.0));
        // shortest arc: 350 -> 350.2, not back toward 346.6
        for c in s.components() {
            assert!((c.direction - 350.2).abs() < 1e-9, "got {}", c.direction);
        }
    }
}
