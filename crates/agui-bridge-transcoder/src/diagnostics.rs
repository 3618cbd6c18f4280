//! Counters for what the stream transcoder saw and skipped.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::error::FailureKind;

/// Lock-free counters, shared by every call of one pipe.
#[derive(Debug, Default)]
pub struct StreamDiagnostics {
    runs: AtomicU64,
    events: AtomicU64,
    chunks: AtomicU64,
    malformed: AtomicU64,
    unknown: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time copy of [`StreamDiagnostics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticsSnapshot {
    pub runs: u64,
    pub events: u64,
    pub chunks: u64,
    pub malformed: u64,
    pub unknown: u64,
    pub failures: u64,
}

impl StreamDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_run(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_event(&self) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_chunk(&self) {
        self.chunks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unknown(&self) {
        self.unknown.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self, kind: FailureKind) {
        match kind {
            FailureKind::MalformedEvent => self.malformed.fetch_add(1, Ordering::Relaxed),
            _ => self.failures.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            runs: self.runs.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
            chunks: self.chunks.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
