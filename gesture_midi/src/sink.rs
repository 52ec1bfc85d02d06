//! Output sinks.
//!
//! A [`MidiSink`] is the synchronous, always-available end of the pipeline.
//! The hardware backend (midir) lives in the application crate; this module
//! provides the null, logging and recording backends.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::info;

use crate::MidiMessage;

// ════════════════════════════════════════════════════════════════════════════
// MidiSink / SendError
// ════════════════════════════════════════════════════════════════════════════

/// Why a message did not reach the output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The port accepted the connection but refused this message.
    #[error("MIDI port rejected message: {0}")]
    Rejected(String),

    /// The port has gone away.
    #[error("MIDI output disconnected")]
    Disconnected,
}

/// Anything that can deliver [`MidiMessage`]s.
pub trait MidiSink: Send {
    fn send(&mut self, msg: &MidiMessage) -> Result<(), SendError>;

    /// Human-readable port name for logs.
    fn name(&self) -> &str;
}

// ── null backend ──────────────────────────────────────────────────────────

/// Swallows everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl MidiSink for NullSink {
    fn send(&mut self, _msg: &MidiMessage) -> Result<(), SendError> { Ok(()) }
    fn name(&self) -> &str { "null" }
}

// ── log backend ───────────────────────────────────────────────────────────

/// Dry-run backend: every message is logged at `info` and accepted.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl MidiSink for LogSink {
    fn send(&mut self, msg: &MidiMessage) -> Result<(), SendError> {
        info!(target: "midi", "{}", msg);
        Ok(())
    }
    fn name(&self) -> &str { "log" }
}

// ════════════════════════════════════════════════════════════════════════════
// RecordingSink
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct Recording {
    delivered:    Vec<MidiMessage>,
    attempts:     usize,
    fail_next:    usize,
    fail_always:  bool,
}

/// In-memory backend.  Clones share one recording, so a test can hand one
/// clone to an [`Emitter`](crate::Emitter) and inspect another.
///
/// Failures can be injected: rejected messages are counted as attempts but
/// not recorded as delivered.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every message delivered so far, in order.
    pub fn messages(&self) -> Vec<MidiMessage> {
        self.lock().delivered.clone()
    }

    /// Return and clear the delivered messages.
    pub fn take(&self) -> Vec<MidiMessage> {
        std::mem::take(&mut self.lock().delivered)
    }

    /// Number of `send` calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    /// Reject the next `n` sends.
    pub fn fail_next(&self, n: usize) {
        self.lock().fail_next = n;
    }

    /// Reject every send until switched off.
    pub fn fail_always(&self, on: bool) {
        self.lock().fail_always = on;
    }
}

impl MidiSink for RecordingSink {
    fn send(&mut self, msg: &MidiMessage) -> Result<(), SendError> {
        let mut rec = self.lock();
        rec.attempts += 1;
        if rec.fail_always {
            return Err(SendError::Disconnected);
        }
        if rec.fail_next > 0 {
            rec.fail_next -= 1;
            return Err(SendError::Rejected("injected failure".to_string()));
        }
        rec.delivered.push(*msg);
        Ok(())
    }

    fn name(&self) -> &str { "recording" }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
