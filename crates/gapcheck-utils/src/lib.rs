//! Shared infrastructure for the gapcheck workspace.
//!
//! This crate carries the error taxonomy, tracing setup, and the small
//! status enums that every other crate reports through. It has no knowledge
//! of runs, phases, or the sandbox; those live in the crates that own them.

pub mod error;
pub mod logging;
pub mod status;

pub use error::{ConfigError, GapcheckError, IntakeError, RunError, SandboxError};
pub use status::{OverallStatus, PhaseStatus, RunStatus};
