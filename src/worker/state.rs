//! Supervisor state store types.

use serde::Serialize;

use crate::worker::log_buffer::StreamLogs;
use crate::worker::process_manager::ExitInfo;

/// Supervisor lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Stopped,
    Checking,
    Starting,
    Running,
    Stopping,
    Error,
}

/// The single process-wide view of the worker. Mutated only by the
/// supervisor; read by any number of concurrent callers.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerState {
    pub status: WorkerStatus,
    pub model_id: Option<String>,
    pub pid: Option<u32>,
    /// Unix epoch seconds of the moment the worker became ready.
    pub started_at: Option<u64>,
    /// Always human-readable and actionable.
    pub message: String,
    pub last_error: Option<String>,
    /// `None` until a check ran, then the last known answer.
    pub installed: Option<bool>,
}

impl Default for WorkerState {
    fn default() -> Self {
        Self {
            status: WorkerStatus::Stopped,
            model_id: None,
            pid: None,
            started_at: None,
            message: "Worker has not been started.".to_string(),
            last_error: None,
            installed: None,
        }
    }
}

/// Diagnostics captured when a worker exits, retained until the next
/// successful start.
#[derive(Debug, Clone, Serialize)]
pub struct ExitSnapshot {
    pub code: Option<i32>,
    pub signal: Option<i32>,
    /// Unix epoch seconds of the exit observation.
    pub at: u64,
    pub stdout_tail: Vec<String>,
    pub stderr_tail: Vec<String>,
}

impl ExitSnapshot {
    pub fn capture(exit: Option<ExitInfo>, logs: &StreamLogs) -> Self {
        Self {
            code: exit.and_then(|e| e.code),
            signal: exit.and_then(|e| e.signal),
            at: now_epoch_secs(),
            stdout_tail: logs.stdout.tail(),
            stderr_tail: logs.stderr.tail(),
        }
    }
}

pub fn now_epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_stopped() {
        let state = WorkerState::default();
        assert_eq!(state.status, WorkerStatus::Stopped);
        assert!(state.pid.is_none());
        assert!(!state.message.is_empty());
    }

    #[test]
    fn test_snapshot_captures_log_tails() {
        let logs = StreamLogs::new(4);
        logs.stdout.push("out line");
        logs.stderr.push("err line");
        let snapshot = ExitSnapshot::capture(
            Some(ExitInfo {
                code: Some(3),
                signal: None,
            }),
            &logs,
        );
        assert_eq!(snapshot.code, Some(3));
        assert_eq!(snapshot.stdout_tail, vec!["out line"]);
        assert_eq!(snapshot.stderr_tail, vec!["err line"]);
        assert!(snapshot.at > 0);
    }
}
