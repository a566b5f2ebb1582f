//! Error taxonomy for the pipeline.
//!
//! The split follows the failure classes the engine distinguishes:
//!
//! | Variant family | Handling |
//! |----------------|----------|
//! | `ConfigError`, `IntakeError` | precondition: fail before any run starts |
//! | `SandboxError` | transient: retried per attempt |
//! | `RunError::EmptyResult` | transient: retried identically |
//! | `GapcheckError::Cancelled` | caller abort: the only error that crosses a phase boundary |
//!
//! Runs that exhaust their retries never surface an error type at all; they
//! degrade to the fallback placeholder and are reported through `RunReport`.

use thiserror::Error;

/// Top-level error type returned by pipeline entry points.
///
/// Library code returns `GapcheckError` and does NOT call
/// `std::process::exit()`; the CLI maps these to exit codes.
#[derive(Error, Debug)]
pub enum GapcheckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("Prompt construction error for run '{run}': missing {needs}")]
    Prompt { run: String, needs: String },

    #[error("Failed to store artifact at {path}: {reason}")]
    ArtifactWrite { path: String, reason: String },

    #[error("Pipeline cancelled by caller")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-file and override errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file at {path}: {reason}")]
    InvalidFile { path: String, reason: String },

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Failed to read configuration file at {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Intake-document errors.
///
/// Note: malformed *sections* inside an intake document are tolerated and
/// degrade to empty objects; these errors cover the document itself.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Failed to read intake file at {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Intake document is not valid JSON: {reason}")]
    InvalidDocument { reason: String },
}

/// Errors from the sandbox collaborator.
///
/// Construction-time variants (`MissingCredentials`, `BinaryNotFound`) are
/// preconditions and abort the whole pipeline; everything else is a
/// per-attempt transient failure that the retry loop absorbs.
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Required credential environment variable {var} is not set")]
    MissingCredentials { var: String },

    #[error("Reasoning CLI binary not found: {reason}")]
    BinaryNotFound { reason: String },

    #[error("Failed to spawn sandbox process: {reason}")]
    Spawn { reason: String },

    #[error("Sandbox execution timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Failed to create sandbox work directory at {path}: {reason}")]
    WorkDir { path: String, reason: String },

    #[error("Sandbox IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-attempt failure classification inside the retry loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("{0}")]
    Sandbox(#[from] SandboxError),

    #[error("Sandbox exited with code {exit_code}: {stderr_tail}")]
    ExecutionFailed { exit_code: i32, stderr_tail: String },

    #[error("No valid result generated - output artifact was empty or not created")]
    EmptyResult,

    #[error("Run cancelled")]
    Cancelled,
}

impl RunError {
    /// Whether this failure should consume a retry attempt.
    ///
    /// Cancellation is the only non-retryable case: it aborts the loop
    /// immediately instead of burning attempts.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}
