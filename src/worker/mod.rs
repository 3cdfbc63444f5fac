//! Out-of-process inference worker supervision.
//!
//! The vision-language model runs in a separate child process for:
//! - Warm reuse: repeated scans hit an already-loaded model
//! - Memory reclaim: kill the process to free all VRAM/RAM
//! - Crash isolation: a model crash doesn't take the caller down

pub mod availability;
pub mod ipc_types;
pub mod log_buffer;
pub mod process_manager;
pub mod registry;
pub mod state;
pub mod supervisor;
