//! Production sandbox: the Claude CLI as a child process.
//!
//! The CLI is invoked argv-style only (no shell evaluation), with the prompt
//! piped on stdin and the work directory as cwd so the run's Write tool
//! lands artifacts where the pipeline expects them.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use gapcheck_config::SandboxConfig;
use gapcheck_utils::error::SandboxError;

use crate::types::{RunMetadata, SandboxRequest, SandboxResponse};
use crate::SandboxExecutor;

const STDERR_TAIL_BYTES: usize = 2048;

/// Sandbox that drives the Claude CLI.
pub struct ClaudeSandbox {
    binary: Utf8PathBuf,
    model: Option<String>,
    work_dir: Utf8PathBuf,
}

impl ClaudeSandbox {
    /// Construct from configuration, checking preconditions up front.
    ///
    /// # Errors
    /// - `MissingCredentials` when the configured API-key variable is unset
    ///   or empty; surfaced before any run starts, never retried.
    /// - `BinaryNotFound` when no CLI binary can be resolved.
    /// - `WorkDir` when the artifact directory cannot be created.
    pub fn new_from_config(config: &SandboxConfig) -> Result<Self, SandboxError> {
        if std::env::var(&config.api_key_env)
            .map(|v| v.trim().is_empty())
            .unwrap_or(true)
        {
            return Err(SandboxError::MissingCredentials {
                var: config.api_key_env.clone(),
            });
        }

        let binary = match config.binary.as_deref() {
            Some(path) => {
                let path = Utf8PathBuf::from(path);
                if !path.as_std_path().is_file() {
                    return Err(SandboxError::BinaryNotFound {
                        reason: format!("configured binary {path} does not exist"),
                    });
                }
                path
            }
            None => discover_binary()?,
        };

        Self::with_binary(binary, config.model.clone(), config.output_dir().into())
    }

    /// Construct with an explicit binary and work directory.
    ///
    /// # Errors
    /// Returns `WorkDir` when the work directory cannot be created.
    pub fn with_binary(
        binary: Utf8PathBuf,
        model: Option<String>,
        work_dir: Utf8PathBuf,
    ) -> Result<Self, SandboxError> {
        std::fs::create_dir_all(work_dir.as_std_path()).map_err(|e| SandboxError::WorkDir {
            path: work_dir.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            binary,
            model,
            work_dir,
        })
    }

    fn build_args(&self, request: &SandboxRequest) -> Vec<String> {
        let mut args = vec![
            "--print".to_string(),
            "--dangerously-skip-permissions".to_string(),
            "--output-format".to_string(),
            "json".to_string(),
            "--max-turns".to_string(),
            request.step_budget.to_string(),
        ];
        if let Some(model) = &self.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        args
    }

    /// Read the expected artifact back, falling back to the first JSON file
    /// in the work directory when the run wrote under a different name.
    async fn read_artifact(&self, artifact: &str) -> Option<String> {
        let expected = self.work_dir.join(artifact);
        if let Ok(content) = tokio::fs::read_to_string(expected.as_std_path()).await {
            return Some(content);
        }

        let mut entries = tokio::fs::read_dir(self.work_dir.as_std_path()).await.ok()?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Ok(content) = tokio::fs::read_to_string(&path).await {
                    tracing::debug!(
                        expected = %expected,
                        found = %path.display(),
                        "Expected artifact missing; using fallback file"
                    );
                    return Some(content);
                }
            }
        }
        None
    }
}

fn discover_binary() -> Result<Utf8PathBuf, SandboxError> {
    let path = which::which("claude").map_err(|e| SandboxError::BinaryNotFound {
        reason: format!("claude not found in PATH: {e}"),
    })?;
    Utf8PathBuf::from_path_buf(path).map_err(|p| SandboxError::BinaryNotFound {
        reason: format!("claude path is not valid UTF-8: {}", p.display()),
    })
}

fn tail(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let bytes = text.as_bytes();
    let start = bytes.len().saturating_sub(max_bytes);
    String::from_utf8_lossy(&bytes[start..]).to_string()
}

#[async_trait]
impl SandboxExecutor for ClaudeSandbox {
    async fn execute(&self, request: SandboxRequest) -> Result<SandboxResponse, SandboxError> {
        let args = self.build_args(&request);
        tracing::debug!(
            run = %request.run,
            binary = %self.binary,
            step_budget = request.step_budget,
            timeout_secs = request.timeout.as_secs(),
            "Invoking sandbox CLI"
        );

        let mut child = Command::new(self.binary.as_std_path())
            .args(&args)
            .current_dir(self.work_dir.as_std_path())
            .env("CI", "true")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SandboxError::Spawn {
                reason: e.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // The CLI may exit before consuming the prompt; a broken pipe
            // here is reported by the exit code, not the write.
            if let Err(e) = stdin.write_all(request.prompt.as_bytes()).await {
                tracing::debug!(run = %request.run, error = %e, "Failed to write prompt to stdin");
            }
            drop(stdin);
        }

        let output = match tokio::time::timeout(request.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| SandboxError::Spawn {
                reason: e.to_string(),
            })?,
            Err(_) => {
                // kill_on_drop reaps the child when the future is dropped.
                return Err(SandboxError::Timeout {
                    seconds: request.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = tail(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL_BYTES);
        let exit_code = output.status.code().unwrap_or(-1);

        let file_content = self.read_artifact(&request.output_artifact).await;
        let metadata = RunMetadata::from_stdout(&stdout);

        Ok(SandboxResponse {
            stdout,
            stderr,
            exit_code,
            file_content,
            metadata,
        })
    }
}
