//! Shared helpers for the integration tests.

#![allow(dead_code)]

use sigma_scanner::{ScanLogger, Scanner, SigmaRule};
use std::sync::{Arc, Mutex};

/// Keeps every log line so tests can assert on diagnostics.
#[derive(Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingLogger {
    pub fn errors(&self) -> Vec<String> {
        self.lines_at("error")
    }

    pub fn debugs(&self) -> Vec<String> {
        self.lines_at("debug")
    }

    fn lines_at(&self, level: &str) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl ScanLogger for RecordingLogger {
    fn debug(&self, message: &str) {
        self.lines.lock().unwrap().push(("debug", message.to_string()));
    }

    fn error(&self, message: &str) {
        self.lines.lock().unwrap().push(("error", message.to_string()));
    }
}

/// A scanner wired to a fresh recording logger.
pub fn recording_scanner() -> (Scanner, Arc<RecordingLogger>) {
    let logger = Arc::new(RecordingLogger::default());
    (Scanner::with_logger(logger.clone()), logger)
}

pub fn rule(yaml: &str) -> SigmaRule {
    SigmaRule::from_yaml(yaml).expect("test rule should parse")
}
