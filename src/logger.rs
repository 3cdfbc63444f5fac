//! File-backed logging for the supervisor.
//!
//! The worker's own output goes to the ring buffers in
//! [`crate::worker::log_buffer`]; this logger records supervisor decisions
//! (transitions, timeouts, flushes) for post-mortem reading.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

const DEFAULT_LOG_PATH: &str = "logs/local_vlm.log";

pub struct Logger {
    file: Mutex<File>,
    debug_enabled: bool,
}

impl Logger {
    pub fn new(log_path: &str) -> std::io::Result<Self> {
        if let Some(parent) = Path::new(log_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Logger {
            file: Mutex::new(file),
            debug_enabled: std::env::var("LOCAL_VLM_DEBUG").is_ok(),
        })
    }

    fn write_line(&self, level: &str, message: &str) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "[{timestamp}] [{level}] {message}");
            let _ = file.flush();
        }
    }

    pub fn debug(&self, message: &str) {
        if self.debug_enabled {
            self.write_line("DEBUG", message);
        }
    }

    pub fn info(&self, message: &str) {
        self.write_line("INFO", message);
    }

    pub fn warn(&self, message: &str) {
        self.write_line("WARN", message);
    }

    pub fn error(&self, message: &str) {
        self.write_line("ERROR", message);
    }
}

lazy_static::lazy_static! {
    pub static ref LOGGER: Logger = {
        let path = std::env::var("LOCAL_VLM_LOG").unwrap_or_else(|_| DEFAULT_LOG_PATH.to_string());
        Logger::new(&path).expect("Failed to create logger")
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logger::LOGGER.debug(&format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::LOGGER.info(&format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::LOGGER.warn(&format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logger::LOGGER.error(&format!($($arg)*));
    };
}
