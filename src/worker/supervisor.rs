//! Supervisor for the local inference worker process.
//!
//! Owns the single worker child, the process-wide state store, and the
//! request registry. Lifecycle operations (`start`/`stop`) serialize on one
//! async mutex so concurrent callers collapse into a single attempt;
//! `status()` is a plain read and never blocks on them.
//!
//! Pipe plumbing: the worker's stdin is fed by one writer task; stdout and
//! stderr are drained on dedicated threads (pipe reads block) that forward
//! into tokio channels, and an async router dispatches protocol lines to the
//! registry or the lifecycle event stream.

use std::io::{BufRead, BufReader, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, watch, Mutex as TokioMutex};
use uuid::Uuid;

use crate::config::{SupervisorSettings, WorkerConfig};
use crate::error::WorkerError;
use crate::worker::availability::{self, Availability};
use crate::worker::ipc_types::{
    parse_line, ControlLine, InferRequest, LifecycleEvent, WorkerCommand,
};
use crate::worker::log_buffer::StreamLogs;
use crate::worker::process_manager::{ExitInfo, ProcessManager};
use crate::worker::registry::RequestRegistry;
use crate::worker::state::{now_epoch_secs, ExitSnapshot, WorkerState, WorkerStatus};
use crate::{log_debug, log_error, log_info, log_warn};

/// Shared reference to the supervisor. One per process.
pub type SharedSupervisor = Arc<ProcessSupervisor>;

static GLOBAL: OnceLock<SharedSupervisor> = OnceLock::new();

/// Install the process-wide supervisor instance. Returns false when one was
/// already installed (the existing instance stays).
pub fn install_global(supervisor: SharedSupervisor) -> bool {
    GLOBAL.set(supervisor).is_ok()
}

/// The process-wide supervisor, if one was installed.
pub fn global() -> Option<SharedSupervisor> {
    GLOBAL.get().cloned()
}

/// State shared with the detached monitor tasks.
#[derive(Clone)]
struct Shared {
    state: Arc<RwLock<WorkerState>>,
    registry: Arc<RequestRegistry>,
    logs: Arc<StreamLogs>,
    last_exit: Arc<Mutex<Option<ExitSnapshot>>>,
    cmd_tx: Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>,
    /// Bumped per spawn; lets a stale crash monitor recognize it is watching
    /// a worker that has already been replaced.
    generation: Arc<AtomicU64>,
}

/// Handles tied to the currently managed worker process.
struct WorkerHandle {
    manager: Arc<ProcessManager>,
    config: WorkerConfig,
    cmd_tx: mpsc::UnboundedSender<String>,
    exit_rx: watch::Receiver<Option<ExitInfo>>,
    /// Set before any supervisor-initiated termination so the crash monitor
    /// only reacts to exits nobody asked for.
    expected_exit: Arc<AtomicBool>,
}

struct Lifecycle {
    worker: Option<WorkerHandle>,
}

/// Channels wired up when a worker is spawned.
struct WorkerPlumbing {
    cmd_tx: mpsc::UnboundedSender<String>,
    events_rx: mpsc::UnboundedReceiver<LifecycleEvent>,
    exit_rx: watch::Receiver<Option<ExitInfo>>,
    expected_exit: Arc<AtomicBool>,
}

/// Supervisor for the local inference worker.
pub struct ProcessSupervisor {
    settings: SupervisorSettings,
    shared: Shared,
    lifecycle: TokioMutex<Lifecycle>,
}

impl ProcessSupervisor {
    pub fn new(settings: SupervisorSettings) -> Self {
        let log_capacity = settings.log_capacity;
        Self {
            settings,
            shared: Shared {
                state: Arc::new(RwLock::new(WorkerState::default())),
                registry: Arc::new(RequestRegistry::new()),
                logs: Arc::new(StreamLogs::new(log_capacity)),
                last_exit: Arc::new(Mutex::new(None)),
                cmd_tx: Arc::new(Mutex::new(None)),
                generation: Arc::new(AtomicU64::new(0)),
            },
            lifecycle: TokioMutex::new(Lifecycle { worker: None }),
        }
    }

    /// Supervisor with defaults and `LOCAL_VLM_*` environment overrides.
    pub fn from_env() -> Self {
        Self::new(SupervisorSettings::from_env())
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    /// Current state. Pure read; never blocks on an in-flight start/stop.
    pub fn status(&self) -> WorkerState {
        match self.shared.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Diagnostics from the most recent worker exit, if any happened since
    /// the last successful start.
    pub fn last_exit(&self) -> Option<ExitSnapshot> {
        lock_unpoisoned(&self.shared.last_exit).clone()
    }

    /// Recent worker output: `(stdout tail, stderr tail)`.
    pub fn recent_logs(&self) -> (Vec<String>, Vec<String>) {
        (self.shared.logs.stdout.tail(), self.shared.logs.stderr.tail())
    }

    /// Requests currently awaiting a worker response.
    pub fn pending_requests(&self) -> usize {
        self.shared.registry.len()
    }

    /// Start the worker with `config`. Idempotent while Running with an
    /// identical config; a different config stops the old worker first.
    pub async fn start(&self, config: WorkerConfig) -> Result<WorkerState, WorkerError> {
        config.validate()?;
        let mut lifecycle = self.lifecycle.lock().await;

        if let Some(worker) = &lifecycle.worker {
            if worker.config == config && self.status().status == WorkerStatus::Running {
                log_info!(
                    "start(): worker already running model '{}', nothing to do",
                    config.model_id
                );
                return Ok(self.status());
            }
        }
        if lifecycle.worker.is_some() {
            log_info!("start(): replacing existing worker (configuration changed or stale)");
            self.stop_locked(&mut lifecycle).await;
        }

        self.set_state(|s| {
            s.status = WorkerStatus::Checking;
            s.model_id = Some(config.model_id.clone());
            s.message = format!("Checking availability of '{}'…", config.model_id);
            s.last_error = None;
        });

        let availability = match availability::check(&self.settings, &config.model_id).await {
            Ok(availability) => availability,
            Err(err) => {
                self.fail(&err.to_string());
                return Err(err);
            }
        };
        self.set_state(|s| s.installed = Some(availability.installed));
        if !availability.installed {
            self.fail(&availability.message);
            return Err(WorkerError::Availability {
                message: availability.message,
            });
        }

        self.set_state(|s| {
            s.status = WorkerStatus::Starting;
            s.message = format!("Launching inference worker for '{}'…", config.model_id);
        });
        self.shared.logs.clear();
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let manager = match ProcessManager::spawn(&self.settings.worker_argv, &config) {
            Ok(manager) => Arc::new(manager),
            Err(err) => {
                self.fail(&err.to_string());
                return Err(err);
            }
        };
        let pid = manager.pid();
        self.set_state(|s| s.pid = Some(pid));
        log_info!("Worker spawned (pid={pid}), waiting for readiness");

        let plumbing = match self.attach(&manager, generation) {
            Ok(plumbing) => plumbing,
            Err(err) => {
                manager.kill();
                self.fail(&err.to_string());
                return Err(err);
            }
        };
        let WorkerPlumbing {
            cmd_tx,
            mut events_rx,
            mut exit_rx,
            expected_exit,
        } = plumbing;

        let ready_message = match self
            .wait_for_ready(&config, &manager, &mut events_rx, &mut exit_rx, &expected_exit)
            .await
        {
            Ok(message) => message,
            Err(err) => return Err(err),
        };

        *lock_unpoisoned(&self.shared.cmd_tx) = Some(cmd_tx.clone());
        *lock_unpoisoned(&self.shared.last_exit) = None;
        lifecycle.worker = Some(WorkerHandle {
            manager,
            config: config.clone(),
            cmd_tx,
            exit_rx,
            expected_exit,
        });
        self.set_state(|s| {
            s.status = WorkerStatus::Running;
            s.pid = Some(pid);
            s.started_at = Some(now_epoch_secs());
            s.installed = Some(true);
            s.message = ready_message
                .unwrap_or_else(|| format!("Model '{}' is ready.", config.model_id));
        });
        log_info!("Worker running (pid={pid}, model='{}')", config.model_id);
        Ok(self.status())
    }

    /// Stop the worker. Idempotent; resolves Stopped even when the worker has
    /// to be force-terminated after the grace period.
    pub async fn stop(&self) -> WorkerState {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.worker.is_none() && self.status().status == WorkerStatus::Stopped {
            return self.status();
        }
        self.stop_locked(&mut lifecycle).await;
        self.status()
    }

    /// Submit one inference request and await its response, bounded by
    /// `timeout`. A timed-out request is discarded; its late response, if
    /// any, is dropped by the registry.
    pub async fn submit(
        &self,
        request: InferRequest,
        timeout: Duration,
    ) -> Result<Value, WorkerError> {
        if self.status().status != WorkerStatus::Running {
            return Err(WorkerError::NotRunning);
        }
        let Some(cmd_tx) = lock_unpoisoned(&self.shared.cmd_tx).clone() else {
            return Err(WorkerError::NotRunning);
        };

        let id = Uuid::new_v4().to_string();
        let rx = self.shared.registry.register(&id);
        let command = WorkerCommand::Infer {
            id: id.clone(),
            request,
        };
        let json = match serde_json::to_string(&command) {
            Ok(json) => json,
            Err(e) => {
                self.shared.registry.discard(&id);
                return Err(WorkerError::Io(format!("failed to encode request: {e}")));
            }
        };
        if cmd_tx.send(json).is_err() {
            self.shared.registry.discard(&id);
            return Err(WorkerError::NotRunning);
        }
        log_debug!("Submitted inference request id={id}");

        match tokio::time::timeout(timeout, rx).await {
            Err(_) => {
                self.shared.registry.discard(&id);
                let ms = timeout.as_millis() as u64;
                log_warn!("Inference request id={id} timed out after {ms}ms");
                Err(WorkerError::InferenceTimeout { ms })
            }
            // Sender dropped without settling: the registry entry vanished
            // with the worker teardown.
            Ok(Err(_)) => Err(WorkerError::NotRunning),
            Ok(Ok(outcome)) => outcome,
        }
    }

    /// Standalone availability check; also records the answer in the state
    /// store so `status()` reflects it.
    pub async fn check_availability(&self, model_id: &str) -> Result<Availability, WorkerError> {
        let availability = availability::check(&self.settings, model_id).await?;
        self.set_state(|s| {
            s.installed = Some(availability.installed);
            if matches!(s.status, WorkerStatus::Stopped | WorkerStatus::Error) {
                s.message = availability.message.clone();
            }
        });
        Ok(availability)
    }

    async fn wait_for_ready(
        &self,
        config: &WorkerConfig,
        manager: &Arc<ProcessManager>,
        events_rx: &mut mpsc::UnboundedReceiver<LifecycleEvent>,
        exit_rx: &mut watch::Receiver<Option<ExitInfo>>,
        expected_exit: &Arc<AtomicBool>,
    ) -> Result<Option<String>, WorkerError> {
        let deadline = tokio::time::Instant::now() + self.settings.ready_timeout;
        loop {
            let event = match tokio::time::timeout_at(deadline, events_rx.recv()).await {
                Err(_) => {
                    expected_exit.store(true, Ordering::SeqCst);
                    manager.kill();
                    let secs = self.settings.ready_timeout.as_secs();
                    self.fail(&format!(
                        "Worker did not become ready within {secs}s; it was terminated."
                    ));
                    return Err(WorkerError::StartupTimeout { secs });
                }
                Ok(None) => {
                    // stdout closed before `ready` — the process died
                    expected_exit.store(true, Ordering::SeqCst);
                    let exit = tokio::time::timeout(Duration::from_secs(2), wait_exit(exit_rx))
                        .await
                        .ok()
                        .flatten();
                    manager.kill();
                    let snapshot = ExitSnapshot::capture(exit, &self.shared.logs);
                    *lock_unpoisoned(&self.shared.last_exit) = Some(snapshot);
                    let reason = format!(
                        "worker exited during startup ({})",
                        exit.map_or_else(|| "output stream closed".to_string(), |e| e.describe())
                    );
                    self.fail(&reason);
                    return Err(WorkerError::Crash { reason });
                }
                Ok(Some(event)) => event,
            };
            match event {
                LifecycleEvent::Starting { message } => {
                    self.set_state(|s| {
                        s.message = message
                            .unwrap_or_else(|| "Worker is loading the model…".to_string());
                    });
                }
                LifecycleEvent::Checked { .. } => {}
                LifecycleEvent::Ready { message } => return Ok(message),
                LifecycleEvent::Missing { error } => {
                    expected_exit.store(true, Ordering::SeqCst);
                    manager.kill();
                    let message =
                        format!("{error} {}", availability::remediation(&config.model_id));
                    self.set_state(|s| s.installed = Some(false));
                    self.fail(&message);
                    return Err(WorkerError::Availability { message });
                }
                LifecycleEvent::Fatal { error } | LifecycleEvent::Error { error } => {
                    expected_exit.store(true, Ordering::SeqCst);
                    manager.kill();
                    let reason = format!("worker reported a fatal startup error: {error}");
                    self.fail(&reason);
                    return Err(WorkerError::Crash { reason });
                }
                LifecycleEvent::Stopped { .. } => {
                    expected_exit.store(true, Ordering::SeqCst);
                    manager.kill();
                    let reason = "worker announced shutdown before becoming ready".to_string();
                    self.fail(&reason);
                    return Err(WorkerError::Crash { reason });
                }
            }
        }
    }

    /// Tear down the current worker under the lifecycle lock.
    async fn stop_locked(&self, lifecycle: &mut Lifecycle) {
        let Some(mut worker) = lifecycle.worker.take() else {
            let status = self.status().status;
            if !matches!(status, WorkerStatus::Stopped | WorkerStatus::Error) {
                self.set_state(|s| {
                    s.status = WorkerStatus::Stopped;
                    s.pid = None;
                    s.started_at = None;
                    s.message = "Worker stopped.".to_string();
                });
            }
            return;
        };

        *lock_unpoisoned(&self.shared.cmd_tx) = None;
        self.set_state(|s| {
            s.status = WorkerStatus::Stopping;
            s.message = "Stopping worker…".to_string();
        });
        worker.expected_exit.store(true, Ordering::SeqCst);

        if let Ok(json) = serde_json::to_string(&WorkerCommand::Shutdown) {
            let _ = worker.cmd_tx.send(json);
        }

        let grace = self.settings.shutdown_grace;
        let mut forced = false;
        let exited = tokio::time::timeout(grace, wait_exit(&mut worker.exit_rx))
            .await
            .is_ok();
        if !exited {
            log_warn!(
                "Worker ignored shutdown for {}ms, terminating",
                grace.as_millis()
            );
            forced = true;
            let manager = worker.manager.clone();
            // kill() blocks on reaping; keep it off the runtime
            let _ = tokio::task::spawn_blocking(move || manager.kill()).await;
            let _ = tokio::time::timeout(Duration::from_secs(2), wait_exit(&mut worker.exit_rx))
                .await;
        }

        let exit = *worker.exit_rx.borrow();
        {
            let mut last_exit = lock_unpoisoned(&self.shared.last_exit);
            if last_exit.is_none() {
                *last_exit = Some(ExitSnapshot::capture(exit, &self.shared.logs));
            }
        }
        self.shared.registry.flush(&WorkerError::Stopped);
        self.set_state(|s| {
            s.status = WorkerStatus::Stopped;
            s.pid = None;
            s.started_at = None;
            s.message = if forced {
                "Worker did not exit within the grace period and was terminated.".to_string()
            } else {
                "Worker stopped.".to_string()
            };
        });
        log_info!("Worker stopped (forced={forced})");
    }

    /// Wire stdin/stdout/stderr plumbing and the exit/crash monitors for a
    /// freshly spawned worker.
    fn attach(
        &self,
        manager: &Arc<ProcessManager>,
        generation: u64,
    ) -> Result<WorkerPlumbing, WorkerError> {
        let stdin = manager
            .take_stdin()
            .ok_or_else(|| WorkerError::Io("worker stdin not available".to_string()))?;
        let stdout = manager
            .take_stdout()
            .ok_or_else(|| WorkerError::Io("worker stdout not available".to_string()))?;
        let stderr = manager
            .take_stderr()
            .ok_or_else(|| WorkerError::Io("worker stderr not available".to_string()))?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(stdin_writer_task(cmd_rx, stdin));

        let (line_tx, line_rx) = mpsc::unbounded_channel::<String>();
        std::thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines().map_while(Result::ok) {
                if line.trim().is_empty() {
                    continue;
                }
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        });

        let (events_tx, events_rx) = mpsc::unbounded_channel::<LifecycleEvent>();
        tokio::spawn(stdout_router_task(
            line_rx,
            self.shared.registry.clone(),
            self.shared.logs.clone(),
            events_tx,
        ));

        let logs = self.shared.logs.clone();
        std::thread::spawn(move || {
            let reader = BufReader::new(stderr);
            for line in reader.lines().map_while(Result::ok) {
                log_debug!("[worker stderr] {line}");
                logs.stderr.push(line);
            }
        });

        let exit_rx = spawn_exit_watcher(manager.clone(), self.settings.exit_poll_interval);
        let expected_exit = Arc::new(AtomicBool::new(false));
        tokio::spawn(crash_monitor(
            exit_rx.clone(),
            expected_exit.clone(),
            generation,
            self.shared.clone(),
        ));

        Ok(WorkerPlumbing {
            cmd_tx,
            events_rx,
            exit_rx,
            expected_exit,
        })
    }

    fn set_state(&self, f: impl FnOnce(&mut WorkerState)) {
        let mut state = match self.shared.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut state);
    }

    fn fail(&self, message: &str) {
        log_error!("Supervisor error: {message}");
        self.set_state(|s| {
            s.status = WorkerStatus::Error;
            s.pid = None;
            s.started_at = None;
            s.message = message.to_string();
            s.last_error = Some(message.to_string());
        });
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Resolve once the watched worker exit is known.
async fn wait_exit(rx: &mut watch::Receiver<Option<ExitInfo>>) -> Option<ExitInfo> {
    loop {
        if let Some(info) = *rx.borrow() {
            return Some(info);
        }
        if rx.changed().await.is_err() {
            return *rx.borrow();
        }
    }
}

/// Poll the child until it exits, then publish the exit info.
fn spawn_exit_watcher(
    manager: Arc<ProcessManager>,
    poll_interval: Duration,
) -> watch::Receiver<Option<ExitInfo>> {
    let (tx, rx) = watch::channel(None);
    std::thread::spawn(move || loop {
        if let Some(info) = manager.try_wait() {
            let _ = tx.send(Some(info));
            break;
        }
        if tx.is_closed() {
            break;
        }
        std::thread::sleep(poll_interval);
    });
    rx
}

/// Reacts to a worker exit nobody asked for: snapshot, flush, Error state.
async fn crash_monitor(
    mut exit_rx: watch::Receiver<Option<ExitInfo>>,
    expected_exit: Arc<AtomicBool>,
    generation: u64,
    shared: Shared,
) {
    let exit = wait_exit(&mut exit_rx).await;
    if expected_exit.load(Ordering::SeqCst) {
        return;
    }
    if shared.generation.load(Ordering::SeqCst) != generation {
        return;
    }

    let reason = format!(
        "worker exited unexpectedly ({})",
        exit.map_or_else(|| "unknown cause".to_string(), |e| e.describe())
    );
    log_error!("{reason}");
    let snapshot = ExitSnapshot::capture(exit, &shared.logs);
    *lock_unpoisoned(&shared.last_exit) = Some(snapshot);
    *lock_unpoisoned(&shared.cmd_tx) = None;
    shared
        .registry
        .flush(&WorkerError::Crash {
            reason: reason.clone(),
        });
    let mut state = match shared.state.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    state.status = WorkerStatus::Error;
    state.pid = None;
    state.started_at = None;
    state.message = format!("{reason}. Recent worker output was captured for diagnostics.");
    state.last_error = Some(reason);
}

/// Writes framed commands to the worker's stdin.
async fn stdin_writer_task(
    mut cmd_rx: mpsc::UnboundedReceiver<String>,
    mut stdin: std::process::ChildStdin,
) {
    while let Some(json_line) = cmd_rx.recv().await {
        if writeln!(stdin, "{json_line}").is_err() {
            log_warn!("Failed to write to worker stdin");
            break;
        }
        if stdin.flush().is_err() {
            log_warn!("Failed to flush worker stdin");
            break;
        }
    }
    log_debug!("Stdin writer task exiting");
}

/// Dispatches classified stdout lines: responses to the registry, lifecycle
/// events to the readiness/shutdown logic, everything else to diagnostics.
async fn stdout_router_task(
    mut line_rx: mpsc::UnboundedReceiver<String>,
    registry: Arc<RequestRegistry>,
    logs: Arc<StreamLogs>,
    events_tx: mpsc::UnboundedSender<LifecycleEvent>,
) {
    while let Some(line) = line_rx.recv().await {
        match parse_line(&line) {
            ControlLine::Event(event) => {
                log_debug!("Worker lifecycle event: {event:?}");
                let _ = events_tx.send(event);
            }
            ControlLine::Response(response) => {
                let id = response.id.clone();
                if !registry.settle(response) {
                    log_warn!("No pending request for worker response id={id}, dropping");
                }
            }
            ControlLine::Unknown(value) => {
                log_warn!("Unrecognized worker message: {value}");
                logs.stdout.push(line);
            }
            ControlLine::Text(text) => {
                logs.stdout.push(text);
            }
        }
    }
    log_debug!("Stdout router task exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_argv(argv: Vec<String>) -> SupervisorSettings {
        SupervisorSettings {
            worker_argv: argv,
            check_timeout: Duration::from_secs(2),
            ready_timeout: Duration::from_secs(2),
            shutdown_grace: Duration::from_millis(200),
            exit_poll_interval: Duration::from_millis(20),
            ..SupervisorSettings::default()
        }
    }

    #[tokio::test]
    async fn test_submit_rejected_when_stopped() {
        let supervisor = ProcessSupervisor::new(SupervisorSettings::default());
        let result = supervisor
            .submit(
                InferRequest::new("ticket.png", "Extract fields."),
                Duration::from_secs(1),
            )
            .await;
        assert!(matches!(result, Err(WorkerError::NotRunning)));
    }

    #[tokio::test]
    async fn test_start_with_invalid_config_rejected_before_any_transition() {
        let supervisor = ProcessSupervisor::new(SupervisorSettings::default());
        let result = supervisor.start(WorkerConfig::new("")).await;
        assert!(matches!(result, Err(WorkerError::Configuration(_))));
        assert_eq!(supervisor.status().status, WorkerStatus::Stopped);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_when_stopped() {
        let supervisor = ProcessSupervisor::new(SupervisorSettings::default());
        let state = supervisor.stop().await;
        assert_eq!(state.status, WorkerStatus::Stopped);
        let state = supervisor.stop().await;
        assert_eq!(state.status, WorkerStatus::Stopped);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_spawn_surfaces_as_error_state() {
        let supervisor = ProcessSupervisor::new(settings_with_argv(vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            // check passes, but the spawned worker dies instantly
            r#"case "$*" in *--check-only*) exit 0;; *) exit 7;; esac"#.to_string(),
            "stub".to_string(),
        ]));
        let result = supervisor.start(WorkerConfig::new("demo/model")).await;
        assert!(matches!(result, Err(WorkerError::Crash { .. })));
        let state = supervisor.status();
        assert_eq!(state.status, WorkerStatus::Error);
        assert!(!state.message.is_empty());
        assert!(supervisor.last_exit().is_some());
    }

    #[test]
    fn test_global_installs_once() {
        let first = Arc::new(ProcessSupervisor::new(SupervisorSettings::default()));
        let _ = install_global(first);
        // A global exists now, whether this test or an earlier one set it
        assert!(global().is_some());
        let second = Arc::new(ProcessSupervisor::new(SupervisorSettings::default()));
        assert!(!install_global(second));
    }
}
