//! Bounded capture of recent worker output, for diagnostics only.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Bounded FIFO of recent lines from one stream. Oldest lines drop first.
pub struct LogRingBuffer {
    capacity: usize,
    lines: Mutex<VecDeque<String>>,
}

impl LogRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            lines: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, line: impl Into<String>) {
        let mut lines = match self.lines.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.into());
    }

    /// Snapshot of the retained lines, oldest first.
    pub fn tail(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
    }
}

/// The two capture buffers for a worker's standard streams.
pub struct StreamLogs {
    pub stdout: LogRingBuffer,
    pub stderr: LogRingBuffer,
}

impl StreamLogs {
    pub fn new(capacity: usize) -> Self {
        Self {
            stdout: LogRingBuffer::new(capacity),
            stderr: LogRingBuffer::new(capacity),
        }
    }

    pub fn clear(&self) {
        self.stdout.clear();
        self.stderr.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_oldest_past_capacity() {
        let buffer = LogRingBuffer::new(3);
        for i in 0..5 {
            buffer.push(format!("line {i}"));
        }
        assert_eq!(buffer.tail(), vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_zero_capacity_keeps_one_line() {
        let buffer = LogRingBuffer::new(0);
        buffer.push("a");
        buffer.push("b");
        assert_eq!(buffer.tail(), vec!["b"]);
    }

    #[test]
    fn test_clear() {
        let buffer = LogRingBuffer::new(4);
        buffer.push("a");
        buffer.clear();
        assert!(buffer.tail().is_empty());
    }
}
