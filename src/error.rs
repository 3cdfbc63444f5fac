//! Failure taxonomy for the worker supervisor.
//!
//! Every variant carries a human-readable message so the routing layer can
//! surface it verbatim. Malformed or unmatched protocol lines are *not*
//! represented here — they are logged and dropped without failing anything.

use thiserror::Error;

/// Errors surfaced by supervisor operations.
///
/// `Clone` because a single crash is fanned out to every pending request.
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    /// The caller-supplied configuration is unusable (e.g. empty model id).
    #[error("invalid worker configuration: {0}")]
    Configuration(String),

    /// Model artifacts are absent locally. The message includes remediation
    /// (package name and download command).
    #[error("{message}")]
    Availability { message: String },

    /// No readiness signal arrived within the configured bound.
    #[error("worker did not become ready within {secs}s")]
    StartupTimeout { secs: u64 },

    /// No response for a submitted request within the caller's bound.
    #[error("inference request timed out after {ms}ms")]
    InferenceTimeout { ms: u64 },

    /// The worker exited while Starting or Running without being asked to.
    #[error("worker crashed: {reason}")]
    Crash { reason: String },

    /// The worker answered a request with `ok: false`.
    #[error("inference failed: {message}")]
    Inference { message: String },

    /// A request was made while no worker is running.
    #[error("inference worker is not running")]
    NotRunning,

    /// The worker was stopped while this request was outstanding.
    #[error("inference worker was stopped")]
    Stopped,

    /// Spawn or pipe plumbing failed.
    #[error("worker i/o failure: {0}")]
    Io(String),
}
