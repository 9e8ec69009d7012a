//! Client frame driver.
//!
//! One display callback: control sampling, boat update, environment update.
//! Rendering consumes the returned [`FrameOutput`]. Server snapshots are
//! applied between frames through
//! [`EnvironmentController::handle_server_update`], last message wins.

use crate::boat::{BoatDynamics, BoatState, ControlInput, ControlSource};
use crate::clock::FrameClock;
use crate::environment::{EnvironmentController, EnvironmentSnapshot};

#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub delta_time: f64,
    pub controls: ControlInput,
    pub boat: BoatState,
    pub environment: EnvironmentSnapshot,
}

pub fn run_frame(
    now: f64,
    clock: &mut FrameClock,
    controls: &mut impl ControlSource,
    boat: &mut impl BoatDynamics,
    environment: &mut EnvironmentController,
) -> FrameOutput {
    let delta_time = clock.tick(now);
    let input = controls.sample();
    boat.update(delta_time, &input, &*environment);
    let state = *boat.state();
    let snapshot = environment.update(delta_time, Some(&state));
    FrameOutput {
        delta_time,
        controls: input,
        boat: state,
        environment: snapshot,
    }
}
