//! The display sink: where user-facing session output goes.
//!
//! Everything a session wants the local human to see — inbound chat,
//! command confirmations, error reports — is funneled through one
//! synchronous method. The console binaries plug in [`ConsoleSink`];
//! tests and headless embedders capture output with [`MemorySink`].
//! Diagnostic logging is separate and goes through `tracing`.

use std::sync::{Arc, Mutex};

/// Receives user-facing output from a session.
pub trait DisplaySink: Send + Sync + 'static {
    /// Displays one line of text. Must not block meaningfully.
    fn display(&self, text: &str);
}

/// Writes each line to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl DisplaySink for ConsoleSink {
    fn display(&self, text: &str) {
        println!("{text}");
    }
}

/// Collects displayed lines in memory for later inspection.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything displayed so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("sink lock").clone()
    }

    /// Returns `true` if any displayed line contains `needle`.
    pub fn saw(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl DisplaySink for MemorySink {
    fn display(&self, text: &str) {
        self.lines.lock().expect("sink lock").push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_lines_in_order() {
        let sink = MemorySink::new();
        sink.display("first");
        sink.display("second");
        assert_eq!(sink.lines(), vec!["first", "second"]);
    }

    #[test]
    fn test_memory_sink_saw_matches_substrings() {
        let sink = MemorySink::new();
        sink.display("alice has logged on.");
        assert!(sink.saw("logged on"));
        assert!(!sink.saw("logged off"));
    }

    #[test]
    fn test_memory_sink_clones_share_storage() {
        let sink = MemorySink::new();
        let clone = sink.clone();
        clone.display("shared");
        assert!(sink.saw("shared"));
    }
}
