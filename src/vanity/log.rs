//! Error sink handed to the resolver at construction.

use std::sync::Mutex;

/// Receives formatted error messages. Fire-and-forget.
pub trait ErrorLog: Send + Sync {
    fn log(&self, message: &str);
}

/// Forwards messages to `tracing` at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl ErrorLog for TracingLog {
    fn log(&self, message: &str) {
        tracing::error!(target: "vanity", "{}", message);
    }
}

/// Drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardLog;

impl ErrorLog for DiscardLog {
    fn log(&self, _message: &str) {}
}

/// Keeps messages in memory, mostly useful for tests.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ErrorLog for MemoryLog {
    fn log(&self, message: &str) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push(message.to_string()),
        }
    }
}
