//! Pantomime - Frame-processing core for skeleton-driven exercise tracking
//!
//! Pantomime turns one skeleton frame per sensor tick into two signals through
//! a deterministic pipeline: joint angles → hysteresis rep counting, and hand
//! projection → region hit testing. Both drive a small phase state machine
//! (login → menu → exercise).
//!
//! ## Modules
//!
//! - **Geometry**: [`vector`], [`angles`], [`projection`]
//! - **State machines**: [`reps`], [`phase`]
//! - **I/O surfaces**: [`schema`] (tick input), [`encoder`] (report output), [`ffi`]

pub mod angles;
pub mod config;
pub mod cues;
pub mod encoder;
pub mod error;
pub mod phase;
pub mod pipeline;
pub mod projection;
pub mod reps;
pub mod schema;
pub mod types;
pub mod vector;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::PipelineConfig;
pub use encoder::{FrameReport, ReportEncoder};
pub use error::TrackingError;
pub use phase::{PhaseController, SessionState};
pub use pipeline::{process_ticks, TickProcessor};

// Schema exports
pub use schema::{select_primary_skeleton, TickAdapter, TickRecord, SCHEMA_VERSION};

/// Pantomime version embedded in every report
pub const PANTOMIME_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "pantomime";
