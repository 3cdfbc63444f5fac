//! Local inference worker supervisor.
//!
//! Launches, monitors, and communicates with a long-lived local
//! vision-language-model inference subprocess so repeated scan requests reuse
//! a warm model instead of paying cold-start cost per call. The model itself
//! (and its OCR/decoding) lives in the external worker process; this crate
//! only starts it, talks JSON lines to it, and tears it down safely under
//! concurrency and failure.

pub mod config;
pub mod error;
pub mod logger;
pub mod worker;

pub use config::{Dtype, SupervisorSettings, WorkerConfig, DEFAULT_MODEL};
pub use error::WorkerError;
pub use worker::availability::Availability;
pub use worker::ipc_types::InferRequest;
pub use worker::state::{ExitSnapshot, WorkerState, WorkerStatus};
pub use worker::supervisor::{global, install_global, ProcessSupervisor, SharedSupervisor};
