//! Worker process lifecycle plumbing.
//!
//! Spawns the external inference worker with config-derived arguments,
//! hands out its stdio pipes, and answers exit polls. Crash/stop policy
//! lives in the supervisor; this type only touches the OS process.

use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::Mutex;

use crate::config::WorkerConfig;
use crate::error::WorkerError;

/// Exit code/signal of a finished worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitInfo {
    pub fn from_status(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            signal: unix_signal(status),
        }
    }

    pub fn describe(&self) -> String {
        match (self.code, self.signal) {
            (Some(code), _) => format!("exit code {code}"),
            (None, Some(signal)) => format!("signal {signal}"),
            (None, None) => "unknown exit status".to_string(),
        }
    }
}

#[cfg(unix)]
fn unix_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn unix_signal(_status: ExitStatus) -> Option<i32> {
    None
}

/// Owns the worker child process.
pub struct ProcessManager {
    child: Mutex<Option<Child>>,
    pid: u32,
}

impl ProcessManager {
    /// Spawn the worker with `argv` (program + fixed args) followed by the
    /// config-derived launch arguments. All three stdio streams are piped.
    pub fn spawn(argv: &[String], config: &WorkerConfig) -> Result<Self, WorkerError> {
        let (program, fixed_args) = argv
            .split_first()
            .ok_or_else(|| WorkerError::Configuration("worker argv is empty".to_string()))?;

        eprintln!(
            "[PROCESS_MGR] Spawning worker: {program} {} {}",
            fixed_args.join(" "),
            config.launch_args().join(" ")
        );

        let child = Command::new(program)
            .args(fixed_args)
            .args(config.launch_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| WorkerError::Io(format!("failed to spawn worker: {e}")))?;

        let pid = child.id();
        Ok(Self {
            child: Mutex::new(Some(child)),
            pid,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Take the child's stdin handle for writing commands.
    pub fn take_stdin(&self) -> Option<ChildStdin> {
        self.with_child(|c| c.stdin.take()).flatten()
    }

    /// Take the child's stdout handle for reading protocol lines.
    pub fn take_stdout(&self) -> Option<ChildStdout> {
        self.with_child(|c| c.stdout.take()).flatten()
    }

    /// Take the child's stderr handle for diagnostic capture.
    pub fn take_stderr(&self) -> Option<ChildStderr> {
        self.with_child(|c| c.stderr.take()).flatten()
    }

    /// Non-blocking exit poll. `None` while the worker is still alive.
    pub fn try_wait(&self) -> Option<ExitInfo> {
        self.with_child(|c| match c.try_wait() {
            Ok(Some(status)) => Some(ExitInfo::from_status(status)),
            Ok(None) => None,
            Err(_) => None,
        })
        .flatten()
    }

    pub fn is_alive(&self) -> bool {
        match self.child.lock() {
            Ok(mut guard) => match guard.as_mut() {
                Some(child) => matches!(child.try_wait(), Ok(None)),
                None => false,
            },
            Err(_) => false,
        }
    }

    /// Kill the worker process immediately and reap it.
    pub fn kill(&self) {
        if let Ok(mut guard) = self.child.lock() {
            if let Some(ref mut child) = *guard {
                eprintln!("[PROCESS_MGR] Killing worker process (pid={})", self.pid);
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }

    fn with_child<T>(&self, f: impl FnOnce(&mut Child) -> T) -> Option<T> {
        self.child
            .lock()
            .ok()
            .and_then(|mut guard| guard.as_mut().map(f))
    }
}

impl Drop for ProcessManager {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_rejects_empty_argv() {
        let config = WorkerConfig::new("demo/model");
        assert!(matches!(
            ProcessManager::spawn(&[], &config),
            Err(WorkerError::Configuration(_))
        ));
    }

    #[test]
    fn test_describe_exit() {
        let info = ExitInfo {
            code: Some(2),
            signal: None,
        };
        assert_eq!(info.describe(), "exit code 2");
        let info = ExitInfo {
            code: None,
            signal: Some(9),
        };
        assert_eq!(info.describe(), "signal 9");
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_poll_and_kill() {
        let config = WorkerConfig::new("demo/model");
        let argv = vec!["/bin/sh".to_string(), "-c".to_string(), "sleep 30".to_string()];
        let manager = ProcessManager::spawn(&argv, &config).unwrap();
        assert!(manager.is_alive());
        assert!(manager.try_wait().is_none());
        manager.kill();
        // kill() reaps, so the exit status is observable afterwards
        assert!(manager.try_wait().is_some());
        assert!(!manager.is_alive());
    }
}
