//! Race state machine.
//!
//! `Idle -> Running` once enough players are connected, `Running -> Finished`
//! through an external finish signal, and back to `Idle` when the last player
//! leaves. Race time only accumulates while `Running`.

use std::time::Instant;

/// Connected players needed to start a race
pub const RACE_START_PLAYERS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceState {
    Idle,
    Running,
    Finished,
}

#[derive(Debug, Clone)]
pub struct Race {
    state: RaceState,
    race_time: f64,
    last_tick: Option<Instant>,
}

impl Default for Race {
    fn default() -> Self {
        Self::new()
    }
}

impl Race {
    pub fn new() -> Self {
        Self {
            state: RaceState::Idle,
            race_time: 0.0,
            last_tick: None,
        }
    }

    pub fn state(&self) -> RaceState {
        self.state
    }

    /// Seconds accumulated while running
    pub fn race_time(&self) -> f64 {
        self.race_time
    }

    pub fn started(&self) -> bool {
        self.state != RaceState::Idle
    }

    pub fn finished(&self) -> bool {
        self.state == RaceState::Finished
    }

    /// Re-evaluate transitions driven by the connected-player count.
    /// Returns the new state if it changed.
    pub fn on_player_count(&mut self, count: usize, now: Instant) -> Option<RaceState> {
        match self.state {
            RaceState::Idle if count >= RACE_START_PLAYERS => {
                self.state = RaceState::Running;
                self.race_time = 0.0;
                self.last_tick = Some(now);
                Some(self.state)
            }
            RaceState::Running | RaceState::Finished if count == 0 => {
                self.reset();
                Some(self.state)
            }
            _ => None,
        }
    }

    /// Advance the race clock to `now`. Returns the wall-clock delta in
    /// seconds while running, `None` otherwise.
    pub fn advance(&mut self, now: Instant) -> Option<f64> {
        if self.state != RaceState::Running {
            return None;
        }
        let last = self.last_tick.unwrap_or(now);
        let delta = now.saturating_duration_since(last).as_secs_f64();
        self.last_tick = Some(now);
        self.race_time += delta;
        Some(delta)
    }

    /// External finish signal. Only a running race can finish.
    pub fn finish(&mut self) -> bool {
        if self.state == RaceState::Running {
            self.state = RaceState::Finished;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.state = RaceState::Idle;
        self.race_time = 0.0;
        self.last_tick = None;
    }
}
