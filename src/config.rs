//! Worker launch configuration and supervisor settings.
//!
//! `WorkerConfig` is the per-start configuration; equality between two
//! configs is what makes a repeated `start()` idempotent. `SupervisorSettings`
//! carries the process-level knobs (worker argv, timeouts, log capacity) with
//! `LOCAL_VLM_*` environment overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::WorkerError;

/// Default model identifier when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-VL-7B-Instruct";

/// Default cap on generated tokens per request.
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 512;

/// Numeric precision requested from the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Float16,
    Bfloat16,
    Float32,
}

impl Dtype {
    pub fn as_arg(self) -> &'static str {
        match self {
            Dtype::Float16 => "float16",
            Dtype::Bfloat16 => "bfloat16",
            Dtype::Float32 => "float32",
        }
    }
}

/// Configuration for one worker instance. Immutable once the worker runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub model_id: String,
    #[serde(default)]
    pub dtype: Option<Dtype>,
    /// Device placement (`cpu`, `cuda`, `cuda:1`, ...). Worker picks when unset.
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    /// Attention implementation hint (e.g. `sdpa`, `flash_attention_2`).
    #[serde(default)]
    pub attn_impl: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_max_new_tokens() -> u32 {
    DEFAULT_MAX_NEW_TOKENS
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl WorkerConfig {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            dtype: None,
            device: None,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            attn_impl: None,
            system_prompt: None,
        }
    }

    pub fn validate(&self) -> Result<(), WorkerError> {
        if self.model_id.trim().is_empty() {
            return Err(WorkerError::Configuration(
                "model id must not be empty".to_string(),
            ));
        }
        if self.max_new_tokens == 0 {
            return Err(WorkerError::Configuration(
                "max_new_tokens must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Command-line arguments appended to the worker argv on launch.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = vec!["--model".to_string(), self.model_id.clone()];
        if let Some(device) = &self.device {
            args.push("--device".to_string());
            args.push(device.clone());
        }
        if let Some(dtype) = self.dtype {
            args.push("--dtype".to_string());
            args.push(dtype.as_arg().to_string());
        }
        if let Some(attn) = &self.attn_impl {
            args.push("--attn-impl".to_string());
            args.push(attn.clone());
        }
        if let Some(prompt) = &self.system_prompt {
            args.push("--system-prompt".to_string());
            args.push(prompt.clone());
        }
        args
    }
}

/// Process-level supervisor settings. One instance per supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Program plus leading arguments used to launch the worker,
    /// e.g. `["python3", "scripts/local_vlm_runner.py"]`.
    pub worker_argv: Vec<String>,
    /// Bounded wait for the worker's `ready` event.
    pub ready_timeout: Duration,
    /// Grace period between the shutdown message and forced termination.
    pub shutdown_grace: Duration,
    /// Bounded wait for a `--check-only` run.
    pub check_timeout: Duration,
    /// Default per-request bound when the caller does not supply one.
    pub request_timeout: Duration,
    /// Lines retained per captured stream.
    pub log_capacity: usize,
    /// How often the exit watcher polls the child.
    pub exit_poll_interval: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            worker_argv: vec![
                "python3".to_string(),
                "scripts/local_vlm_runner.py".to_string(),
            ],
            ready_timeout: Duration::from_secs(120),
            shutdown_grace: Duration::from_secs(10),
            check_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(120),
            log_capacity: 40,
            exit_poll_interval: Duration::from_millis(100),
        }
    }
}

impl SupervisorSettings {
    /// Defaults with `LOCAL_VLM_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(argv) = std::env::var("LOCAL_VLM_WORKER") {
            let parts: Vec<String> = argv.split_whitespace().map(str::to_string).collect();
            if !parts.is_empty() {
                settings.worker_argv = parts;
            }
        }
        if let Some(secs) = env_u64("LOCAL_VLM_READY_TIMEOUT_SECS") {
            settings.ready_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("LOCAL_VLM_SHUTDOWN_GRACE_SECS") {
            settings.shutdown_grace = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("LOCAL_VLM_CHECK_TIMEOUT_SECS") {
            settings.check_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("LOCAL_VLM_REQUEST_TIMEOUT_SECS") {
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(lines) = env_u64("LOCAL_VLM_LOG_CAPACITY") {
            settings.log_capacity = lines as usize;
        }
        settings
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_model() {
        assert!(WorkerConfig::new("   ").validate().is_err());
        assert!(WorkerConfig::new("demo/model").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_max_new_tokens() {
        let mut config = WorkerConfig::new("demo/model");
        config.max_new_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_launch_args_minimal() {
        let config = WorkerConfig::new("demo/model");
        assert_eq!(config.launch_args(), vec!["--model", "demo/model"]);
    }

    #[test]
    fn test_launch_args_full() {
        let config = WorkerConfig {
            model_id: "demo/model".to_string(),
            dtype: Some(Dtype::Bfloat16),
            device: Some("cuda:0".to_string()),
            max_new_tokens: 256,
            attn_impl: Some("sdpa".to_string()),
            system_prompt: Some("You extract ticket fields.".to_string()),
        };
        let args = config.launch_args();
        assert_eq!(
            args,
            vec![
                "--model",
                "demo/model",
                "--device",
                "cuda:0",
                "--dtype",
                "bfloat16",
                "--attn-impl",
                "sdpa",
                "--system-prompt",
                "You extract ticket fields.",
            ]
        );
    }

    #[test]
    fn test_config_equality_drives_idempotence() {
        let a = WorkerConfig::new("demo/model");
        let b = WorkerConfig::new("demo/model");
        let mut c = WorkerConfig::new("demo/model");
        c.device = Some("cpu".to_string());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
