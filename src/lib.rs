//! Grid shooter engine.
//!
//! A 16×24 cell arcade shooter: fixed-timestep scheduling, a stochastic
//! enemy targeting heuristic, shot combat with crossing interception,
//! cosmetic effects, synthesized sound cues and a local leaderboard.
//! The engine is host-independent; `main.rs` drives it from a terminal.

pub mod audio;
pub mod compute;
pub mod config;
pub mod effects;
pub mod entities;
pub mod error;
pub mod grid;
pub mod input;
pub mod leaderboard;
pub mod scheduler;
pub mod session;
pub mod timers;

pub use error::{GameError, Result};
