//! Pending-request registry: correlation ID → one-shot completion handle.
//!
//! Settlement is exactly-once by construction: an entry is removed from the
//! map before anything is sent on its channel, so a late or duplicate
//! response finds nothing to settle and is dropped.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::WorkerError;
use crate::log_warn;
use crate::worker::ipc_types::InferResponse;

/// How a pending request settles.
pub type InferOutcome = Result<Value, WorkerError>;

struct Pending {
    tx: oneshot::Sender<InferOutcome>,
    submitted_at: Instant,
}

/// Tracks requests awaiting a worker response.
#[derive(Default)]
pub struct RequestRegistry {
    pending: Mutex<HashMap<String, Pending>>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh correlation ID. The receiver settles exactly once:
    /// response, flush, or not at all (caller timed out and discarded it).
    pub fn register(&self, id: &str) -> oneshot::Receiver<InferOutcome> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(
            id.to_string(),
            Pending {
                tx,
                submitted_at: Instant::now(),
            },
        );
        rx
    }

    /// Route a worker response to its pending request. Returns false when no
    /// entry matches — protocol desync is recoverable, the response is dropped.
    pub fn settle(&self, response: InferResponse) -> bool {
        let Some(entry) = self.lock().remove(&response.id) else {
            return false;
        };
        log_debug_settled(&response.id, entry.submitted_at);
        let outcome = if response.ok {
            Ok(response.result.unwrap_or(Value::Null))
        } else {
            Err(WorkerError::Inference {
                message: response
                    .error
                    .unwrap_or_else(|| "worker reported an unspecified error".to_string()),
            })
        };
        let _ = entry.tx.send(outcome);
        true
    }

    /// Drop an entry without settling it (caller stopped waiting).
    pub fn discard(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Reject every outstanding request. Returns how many were flushed.
    pub fn flush(&self, error: &WorkerError) -> usize {
        let drained: Vec<Pending> = {
            let mut pending = self.lock();
            pending.drain().map(|(_, entry)| entry).collect()
        };
        let count = drained.len();
        if count > 0 {
            log_warn!("Flushing {count} pending inference request(s): {error}");
        }
        for entry in drained {
            let _ = entry.tx.send(Err(error.clone()));
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Pending>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn log_debug_settled(id: &str, submitted_at: Instant) {
    crate::log_debug!(
        "Settled inference request id={id} after {}ms",
        submitted_at.elapsed().as_millis()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(id: &str, ok: bool) -> InferResponse {
        InferResponse {
            id: id.to_string(),
            ok,
            result: ok.then(|| json!({"text": "out"})),
            error: (!ok).then(|| "bad image".to_string()),
        }
    }

    #[tokio::test]
    async fn test_settles_exactly_once() {
        let registry = RequestRegistry::new();
        let rx = registry.register("a");
        assert!(registry.settle(response("a", true)));
        // second settlement attempt finds nothing
        assert!(!registry.settle(response("a", true)));
        let outcome = rx.await.unwrap();
        assert_eq!(outcome.unwrap()["text"], "out");
    }

    #[tokio::test]
    async fn test_unknown_id_is_dropped_without_side_effects() {
        let registry = RequestRegistry::new();
        let rx = registry.register("wanted");
        assert!(!registry.settle(response("unknown", true)));
        assert_eq!(registry.len(), 1);
        assert!(registry.settle(response("wanted", true)));
        assert!(rx.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_worker_error_response() {
        let registry = RequestRegistry::new();
        let rx = registry.register("a");
        registry.settle(response("a", false));
        match rx.await.unwrap() {
            Err(WorkerError::Inference { message }) => assert_eq!(message, "bad image"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_flush_rejects_all_outstanding() {
        let registry = RequestRegistry::new();
        let rx1 = registry.register("a");
        let rx2 = registry.register("b");
        let flushed = registry.flush(&WorkerError::Crash {
            reason: "exit code 9".to_string(),
        });
        assert_eq!(flushed, 2);
        assert!(registry.is_empty());
        for rx in [rx1, rx2] {
            match rx.await.unwrap() {
                Err(WorkerError::Crash { .. }) => {}
                other => panic!("unexpected: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_discard_prevents_late_settlement() {
        let registry = RequestRegistry::new();
        let _rx = registry.register("a");
        assert!(registry.discard("a"));
        assert!(!registry.settle(response("a", true)));
    }
}
