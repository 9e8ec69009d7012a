//! Shared sailing environment core.
//!
//! Wind, wave spectrum, height-field water and wake emission used by the
//! browser client build, plus the wire protocol spoken with the server.

pub mod boat;
pub mod clock;
pub mod config;
pub mod environment;
pub mod frame;
pub mod heightfield;
pub mod protocol;
pub mod vec3;
pub mod wake;
pub mod waves;
pub mod wind;
