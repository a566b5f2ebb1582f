//! Sandbox collaborator abstraction.
//!
//! A "sandbox" accepts a prompt plus run parameters and returns the raw
//! process output, the expected artifact's content when the run wrote one,
//! and best-effort execution metadata. The engine only depends on the
//! [`SandboxExecutor`] trait; the production implementation drives the
//! Claude CLI as a child process, and [`StubSandbox`] scripts responses for
//! tests and dry runs.

mod claude_cli;
mod stub;
mod types;

pub use claude_cli::ClaudeSandbox;
pub use stub::{StubOutcome, StubSandbox};
pub use types::{RunMetadata, SandboxRequest, SandboxResponse};

use async_trait::async_trait;

use gapcheck_utils::error::SandboxError;

/// The external generation collaborator.
///
/// `Err` means the call itself failed (spawn, timeout, IO); an `Ok` response
/// with a non-zero exit code means the collaborator ran but reported
/// failure. Both are transient from the engine's point of view.
#[async_trait]
pub trait SandboxExecutor: Send + Sync {
    async fn execute(&self, request: SandboxRequest) -> Result<SandboxResponse, SandboxError>;
}
