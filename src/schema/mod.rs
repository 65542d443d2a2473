//! pantomime.tick.v1 input schema
//!
//! This module defines the per-tick input record handed in by the sensor and
//! UI collaborators, plus batch parsing and nearest-skeleton selection.

mod adapter;
mod tick;

pub use adapter::*;
pub use tick::*;
