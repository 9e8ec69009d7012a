/// Longest frame step fed to the simulation (seconds). Longer gaps, e.g.
/// after a stalled tab, are truncated so the water stays stable.
pub const MAX_FRAME_DELTA: f64 = 0.1;

/// Clamp a raw frame delta into [0, MAX_FRAME_DELTA].
pub fn cap_frame_delta(delta: f64) -> f64 {
    if !delta.is_finite() || delta <= 0.0 {
        return 0.0;
    }
    delta.min(MAX_FRAME_DELTA)
}

/// Turns display-callback timestamps into capped frame deltas.
///
/// Timestamps are plain seconds so the clock works with browser
/// `requestAnimationFrame` times as well as native monotonic clocks.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delta since the previous call; 0 on the first call.
    pub fn tick(&mut self, now: f64) -> f64 {
        let delta = match self.last {
            Some(last) => cap_frame_delta(now - last),
            None => 0.0,
        };
        self.last = Some(now);
        delta
    }
}
