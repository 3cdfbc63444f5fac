//! IPC protocol types for supervisor ↔ worker communication.
//!
//! Uses JSON Lines (one JSON object per line) over stdin/stdout pipes.
//! Lifecycle events and inference responses share the worker's stdout; a
//! line that is not valid protocol JSON is diagnostic text, never an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command written to the worker's stdin.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum WorkerCommand {
    /// Run one inference. `id` correlates the eventual response.
    Infer {
        id: String,
        #[serde(flatten)]
        request: InferRequest,
    },
    /// Graceful shutdown. The worker acks with a `stopped` event and exits.
    Shutdown,
}

/// Caller-supplied inference payload, mirroring the worker's generation knobs.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct InferRequest {
    pub image: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_text: Option<String>,
    /// Pre-computed OCR text forwarded to the model as a hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f64>,
}

impl InferRequest {
    pub fn new(image: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// Lifecycle events emitted by the worker on stdout, tagged by `event`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum LifecycleEvent {
    /// Model load began. Informational.
    #[serde(alias = "loading")]
    Starting {
        #[serde(default)]
        message: Option<String>,
    },
    /// Model loaded; the worker can serve requests.
    Ready {
        #[serde(default)]
        message: Option<String>,
    },
    /// Unrecoverable failure.
    Fatal { error: String },
    /// Unrecoverable failure (alternate tag some worker builds emit).
    Error { error: String },
    /// Model artifacts are absent locally.
    Missing { error: String },
    /// `--check-only` run succeeded.
    Checked {
        #[serde(default)]
        message: Option<String>,
    },
    /// Graceful-shutdown acknowledgment.
    Stopped {
        #[serde(default)]
        message: Option<String>,
    },
}

/// Inference response correlated by `id`. `output` is accepted as an alias
/// for `result` (older worker builds used it).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InferResponse {
    pub id: String,
    pub ok: bool,
    #[serde(default, alias = "output")]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Classification of one stdout line.
#[derive(Debug, Clone)]
pub enum ControlLine {
    Event(LifecycleEvent),
    Response(InferResponse),
    /// Valid JSON of an unrecognized shape. Logged, never fatal.
    Unknown(Value),
    /// Not JSON at all — plain diagnostic output.
    Text(String),
}

/// Classify one line of worker stdout.
pub fn parse_line(line: &str) -> ControlLine {
    let Ok(value) = serde_json::from_str::<Value>(line) else {
        return ControlLine::Text(line.to_string());
    };
    if value.get("event").is_some() {
        return match serde_json::from_value::<LifecycleEvent>(value.clone()) {
            Ok(event) => ControlLine::Event(event),
            Err(_) => ControlLine::Unknown(value),
        };
    }
    if value.get("id").is_some() {
        return match serde_json::from_value::<InferResponse>(value.clone()) {
            Ok(response) => ControlLine::Response(response),
            Err(_) => ControlLine::Unknown(value),
        };
    }
    ControlLine::Unknown(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lifecycle_events() {
        match parse_line(r#"{"event":"ready","message":"Model ready."}"#) {
            ControlLine::Event(LifecycleEvent::Ready { message }) => {
                assert_eq!(message.as_deref(), Some("Model ready."));
            }
            other => panic!("unexpected: {other:?}"),
        }
        // `loading` is the legacy spelling of `starting`
        match parse_line(r#"{"event":"loading","message":"Loading…"}"#) {
            ControlLine::Event(LifecycleEvent::Starting { .. }) => {}
            other => panic!("unexpected: {other:?}"),
        }
        match parse_line(r#"{"event":"missing","error":"weights absent"}"#) {
            ControlLine::Event(LifecycleEvent::Missing { error }) => {
                assert_eq!(error, "weights absent");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_response_with_result_alias() {
        match parse_line(r#"{"id":"x","ok":true,"output":{"text":"hi"}}"#) {
            ControlLine::Response(resp) => {
                assert!(resp.ok);
                assert_eq!(resp.result.unwrap()["text"], "hi");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_extra_fields_are_tolerated() {
        // The original runner attaches host/port metadata to `ready`
        match parse_line(r#"{"event":"ready","message":"ok","host":"127.0.0.1","port":8411}"#) {
            ControlLine::Event(LifecycleEvent::Ready { .. }) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_non_json_is_diagnostic_text() {
        match parse_line("some stray traceback line") {
            ControlLine::Text(text) => assert_eq!(text, "some stray traceback line"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unrecognized_json_is_unknown() {
        assert!(matches!(
            parse_line(r#"{"event":"telemetry","gpu":1}"#),
            ControlLine::Unknown(_)
        ));
        assert!(matches!(
            parse_line(r#"{"progress":0.5}"#),
            ControlLine::Unknown(_)
        ));
        // numeric id does not match the response shape
        assert!(matches!(
            parse_line(r#"{"id":7,"ok":true}"#),
            ControlLine::Unknown(_)
        ));
    }

    #[test]
    fn test_command_wire_format() {
        let shutdown = serde_json::to_string(&WorkerCommand::Shutdown).unwrap();
        assert_eq!(shutdown, r#"{"action":"shutdown"}"#);

        let infer = WorkerCommand::Infer {
            id: "abc".to_string(),
            request: InferRequest::new("ticket.png", "Extract the fields."),
        };
        let json: Value = serde_json::from_str(&serde_json::to_string(&infer).unwrap()).unwrap();
        assert_eq!(json["action"], "infer");
        assert_eq!(json["id"], "abc");
        assert_eq!(json["image"], "ticket.png");
        assert!(json.get("system_prompt").is_none());
    }
}
