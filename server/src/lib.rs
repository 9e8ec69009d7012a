//! Regatta server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod config;
pub mod game_loop;
pub mod listener;
pub mod player;
pub mod race;
pub mod state;
pub mod ws;
