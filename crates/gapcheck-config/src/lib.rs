//! Configuration for the gap-analysis pipeline.
//!
//! Precedence, lowest to highest: built-in defaults, a `gapcheck.toml` file
//! (working directory first, then the user config directory), then
//! `GAPCHECK_*` environment variables. Every field has a default, so a
//! missing file or a partial file is never an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use gapcheck_utils::error::ConfigError;

/// Retry policy for a single run.
///
/// Defaults produce backoff delays of 2000 ms, 4000 ms, 8000 ms for attempts
/// 0, 1, 2, well under the 30 s clamp at this scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Additional attempts after the first (so 3 means up to 4 invocations).
    pub max_retries: u32,
    /// Base delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper clamp on any single backoff delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Exponential growth factor between retries.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 2000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff delay before retrying after the given zero-based attempt:
    /// `min(max_delay, base * multiplier^attempt)`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let raw = self.base_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let clamped = raw.min(self.max_delay_ms as f64);
        Duration::from_millis(clamped as u64)
    }

    /// A policy with zero delays, for tests that exercise the retry loop.
    #[must_use]
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
        }
    }
}

/// Timeout budgets at the three enforcement levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Budget for a single sandbox invocation, in seconds.
    pub per_run_secs: u64,
    /// Deadline for a whole phase, in seconds. Runs that would start after
    /// the deadline degrade straight to their fallback.
    pub per_phase_secs: u64,
    /// Sandbox lifetime ceiling, in seconds.
    pub sandbox_lifetime_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            per_run_secs: 900,
            per_phase_secs: 2400,
            sandbox_lifetime_secs: 3600,
        }
    }
}

impl TimeoutConfig {
    #[must_use]
    pub const fn per_run(&self) -> Duration {
        Duration::from_secs(self.per_run_secs)
    }

    #[must_use]
    pub const fn per_phase(&self) -> Duration {
        Duration::from_secs(self.per_phase_secs)
    }
}

/// Sandbox collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Explicit path to the reasoning CLI binary. When absent, `PATH` is
    /// searched.
    pub binary: Option<String>,
    /// Model passed through to the CLI; when absent the CLI default applies.
    pub model: Option<String>,
    /// Directory where run artifacts are written. Defaults to `./generated`.
    pub output_dir: Option<String>,
    /// Environment variable holding the API credential.
    pub api_key_env: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            binary: None,
            model: None,
            output_dir: None,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
        }
    }
}

impl SandboxConfig {
    /// Resolved artifact output directory.
    #[must_use]
    pub fn output_dir(&self) -> &str {
        self.output_dir.as_deref().unwrap_or("generated")
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub retry: RetryConfig,
    pub timeouts: TimeoutConfig,
    pub sandbox: SandboxConfig,
}

impl Config {
    /// Parse a configuration document, tolerating omitted sections.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidFile` when the TOML is malformed.
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFile {
            path: origin.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Discover configuration: `./gapcheck.toml`, then the user config
    /// directory, then defaults. Environment overrides are applied last.
    ///
    /// # Errors
    /// Returns an error only when a file exists but is unreadable or
    /// malformed; a missing file is not an error.
    pub fn discover() -> Result<Self, ConfigError> {
        let mut config = None;

        for candidate in Self::candidate_paths() {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "Loading configuration file");
                config = Some(Self::from_file(&candidate)?);
                break;
            }
        }

        let mut config = config.unwrap_or_default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("gapcheck.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("gapcheck").join("config.toml"));
        }
        paths
    }

    /// Apply `GAPCHECK_*` environment variable overrides in place.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` when a numeric override does not
    /// parse.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_u64("GAPCHECK_MAX_RETRIES")? {
            self.retry.max_retries = v as u32;
        }
        if let Some(v) = env_u64("GAPCHECK_BASE_DELAY_MS")? {
            self.retry.base_delay_ms = v;
        }
        if let Some(v) = env_u64("GAPCHECK_MAX_DELAY_MS")? {
            self.retry.max_delay_ms = v;
        }
        if let Some(v) = env_u64("GAPCHECK_PER_RUN_TIMEOUT_SECS")? {
            self.timeouts.per_run_secs = v;
        }
        if let Some(v) = env_u64("GAPCHECK_PER_PHASE_TIMEOUT_SECS")? {
            self.timeouts.per_phase_secs = v;
        }
        if let Ok(v) = std::env::var("GAPCHECK_SANDBOX_BINARY") {
            self.sandbox.binary = Some(v);
        }
        if let Ok(v) = std::env::var("GAPCHECK_MODEL") {
            self.sandbox.model = Some(v);
        }
        if let Ok(v) = std::env::var("GAPCHECK_OUTPUT_DIR") {
            self.sandbox.output_dir = Some(v);
        }
        if let Ok(v) = std::env::var("GAPCHECK_API_KEY_ENV") {
            self.sandbox.api_key_env = v;
        }
        Ok(())
    }
}

fn env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}
