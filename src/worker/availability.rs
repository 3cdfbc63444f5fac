//! Pre-flight check that model artifacts exist locally.
//!
//! Runs the worker binary in `--check-only` mode: it exits 0 when the model
//! is fully cached, non-zero otherwise, emitting `missing`/`fatal` events on
//! the way out. No readiness wait — the process runs to completion.

use std::process::Stdio;

use tokio::process::Command;

use crate::config::SupervisorSettings;
use crate::error::WorkerError;
use crate::worker::ipc_types::{parse_line, ControlLine, LifecycleEvent};
use crate::{log_info, log_warn};

/// Result of an availability check.
#[derive(Debug, Clone)]
pub struct Availability {
    pub installed: bool,
    /// Human-readable outcome; carries remediation when not installed.
    pub message: String,
}

/// Remediation text shown whenever model artifacts are absent.
pub fn remediation(model_id: &str) -> String {
    format!(
        "Install the huggingface_hub package (pip install -U huggingface_hub) \
         and download the weights with: huggingface-cli download {model_id}"
    )
}

/// Run the worker in `--check-only` mode and report whether `model_id` is
/// installed locally. Bounded by `settings.check_timeout`.
pub async fn check(
    settings: &SupervisorSettings,
    model_id: &str,
) -> Result<Availability, WorkerError> {
    let model_id = model_id.trim();
    if model_id.is_empty() {
        return Err(WorkerError::Configuration(
            "model id must not be empty".to_string(),
        ));
    }
    let (program, fixed_args) = settings
        .worker_argv
        .split_first()
        .ok_or_else(|| WorkerError::Configuration("worker argv is empty".to_string()))?;

    log_info!("Checking local availability of model '{model_id}'");

    let mut command = Command::new(program);
    command
        .args(fixed_args)
        .arg("--model")
        .arg(model_id)
        .arg("--check-only")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(settings.check_timeout, command.output())
        .await
        .map_err(|_| WorkerError::Availability {
            message: format!(
                "Availability check for '{model_id}' did not finish within {}s. {}",
                settings.check_timeout.as_secs(),
                remediation(model_id)
            ),
        })?
        .map_err(|e| WorkerError::Io(format!("failed to run availability check: {e}")))?;

    let event_message = first_event_message(&output.stdout).or_else(|| {
        // older worker builds logged the import-failure event on stderr
        first_event_message(&output.stderr)
    });

    if output.status.success() {
        let message = event_message
            .unwrap_or_else(|| format!("Model '{model_id}' is available locally."));
        log_info!("Availability check passed: {message}");
        return Ok(Availability {
            installed: true,
            message,
        });
    }

    let detail = event_message
        .unwrap_or_else(|| format!("Model '{model_id}' is not available locally."));
    let message = format!("{detail} {}", remediation(model_id));
    log_warn!("Availability check failed: {message}");
    Ok(Availability {
        installed: false,
        message,
    })
}

/// First lifecycle event message found in captured check output.
fn first_event_message(raw: &[u8]) -> Option<String> {
    for line in String::from_utf8_lossy(raw).lines() {
        match parse_line(line) {
            ControlLine::Event(LifecycleEvent::Missing { error })
            | ControlLine::Event(LifecycleEvent::Fatal { error })
            | ControlLine::Event(LifecycleEvent::Error { error }) => return Some(error),
            ControlLine::Event(LifecycleEvent::Checked { message }) => {
                if let Some(message) = message {
                    return Some(message);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_event_message_prefers_events() {
        let raw = b"warming up\n{\"event\":\"missing\",\"error\":\"no weights\"}\n";
        assert_eq!(first_event_message(raw).as_deref(), Some("no weights"));
        assert_eq!(first_event_message(b"plain noise\n"), None);
    }

    #[test]
    fn test_remediation_names_package_and_command() {
        let text = remediation("demo/model");
        assert!(text.contains("huggingface_hub"));
        assert!(text.contains("huggingface-cli download demo/model"));
    }

    #[tokio::test]
    async fn test_empty_model_id_is_configuration_error() {
        let settings = SupervisorSettings::default();
        assert!(matches!(
            check(&settings, "  ").await,
            Err(WorkerError::Configuration(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_check_against_stub_scripts() {
        use std::time::Duration;

        let mut settings = SupervisorSettings {
            check_timeout: Duration::from_secs(5),
            ..SupervisorSettings::default()
        };

        // installed stub: exits 0 with a `checked` event
        settings.worker_argv = vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            r#"printf '{"event":"checked","message":"cached"}\n'; exit 0"#.to_string(),
            "check".to_string(),
        ];
        let result = check(&settings, "demo/model").await.unwrap();
        assert!(result.installed);
        assert_eq!(result.message, "cached");

        // missing stub: exits 2 with a `missing` event
        settings.worker_argv = vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            r#"printf '{"event":"missing","error":"weights absent"}\n'; exit 2"#.to_string(),
            "check".to_string(),
        ];
        let result = check(&settings, "nonexistent/model").await.unwrap();
        assert!(!result.installed);
        assert!(result.message.contains("weights absent"));
        assert!(result.message.contains("huggingface-cli download nonexistent/model"));
    }
}
