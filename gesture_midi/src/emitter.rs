//! Event emitter: note lifecycles and debounced control changes.
//!
//! A *voice* is one independently sustained note lifecycle, identified by a
//! [`VoiceId`] chosen by the controller.  The emitter remembers which
//! (channel, note) each voice is sounding and enforces strict on/off
//! alternation:
//!
//! * `note_on` on a sounding voice closes the old note first, even when the
//!   note is the same (a re-strike);
//! * `note_off` on a silent voice is a no-op.
//!
//! ## Failure policy
//!
//! State changes only after the sink accepts a message:
//!
//! | Failed send | Resulting state |
//! |---|---|
//! | close-before-open | voice still sounding the old note; the note-on is not sent |
//! | note-on | voice silent |
//! | note-off | voice still sounding; the next close retries it |
//! | control change | cache unchanged; the same value is sent next time |
//!
//! Failures are logged and collected; the caller drains them with
//! [`Emitter::take_failures`].

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::cache::{ControlKey, DebounceCache};
use crate::sink::{MidiSink, SendError};
use crate::MidiMessage;

// ════════════════════════════════════════════════════════════════════════════
// VoiceId / Delivery / EmitFailure
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoiceId(pub u16);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice{}", self.0)
    }
}

/// What happened to a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// All required messages reached the sink.
    Sent,
    /// Nothing needed sending (unchanged CC, closing a silent voice).
    Skipped,
    /// A send failed; see [`Emitter::take_failures`].
    Failed,
}

impl Delivery {
    /// The requested state now holds (sent or already true).
    pub fn landed(self) -> bool {
        self != Delivery::Failed
    }
}

/// A message the sink refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitFailure {
    pub message: MidiMessage,
    pub error:   SendError,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Sounding {
    channel: u8,
    note:    u8,
}

// ════════════════════════════════════════════════════════════════════════════
// Emitter
// ════════════════════════════════════════════════════════════════════════════

pub struct Emitter {
    sink:     Box<dyn MidiSink>,
    cache:    DebounceCache,
    voices:   BTreeMap<VoiceId, Sounding>,
    failures: Vec<EmitFailure>,
    sent:     u64,
}

impl Emitter {
    pub fn new(sink: Box<dyn MidiSink>) -> Self {
        Emitter {
            sink,
            cache:    DebounceCache::new(),
            voices:   BTreeMap::new(),
            failures: Vec::new(),
            sent:     0,
        }
    }

    pub fn sink_name(&self) -> &str { self.sink.name() }

    /// Messages delivered since construction.
    pub fn sent_count(&self) -> u64 { self.sent }

    fn send(&mut self, msg: MidiMessage) -> bool {
        match self.sink.send(&msg) {
            Ok(()) => {
                self.sent += 1;
                debug!(target: "midi", "{}", msg);
                true
            }
            Err(error) => {
                warn!(%error, message = %msg, "MIDI send failed");
                self.failures.push(EmitFailure { message: msg, error });
                false
            }
        }
    }

    // ── notes ─────────────────────────────────────────────────────────────

    /// Start `note` on `voice`, closing whatever the voice was sounding.
    pub fn note_on(&mut self, voice: VoiceId, channel: u8, note: u8, velocity: u8) -> Delivery {
        if self.note_off(voice) == Delivery::Failed {
            return Delivery::Failed;
        }
        if !self.send(MidiMessage::note_on(channel, note, velocity)) {
            return Delivery::Failed;
        }
        self.voices.insert(voice, Sounding { channel, note });
        Delivery::Sent
    }

    /// Close `voice` if it is sounding.
    pub fn note_off(&mut self, voice: VoiceId) -> Delivery {
        let Some(s) = self.voices.get(&voice).copied() else {
            return Delivery::Skipped;
        };
        if !self.send(MidiMessage::note_off(s.channel, s.note)) {
            return Delivery::Failed;
        }
        self.voices.remove(&voice);
        Delivery::Sent
    }

    pub fn is_sounding(&self, voice: VoiceId) -> bool {
        self.voices.contains_key(&voice)
    }

    /// The (channel, note) `voice` is sounding.
    pub fn sounding(&self, voice: VoiceId) -> Option<(u8, u8)> {
        self.voices.get(&voice).map(|s| (s.channel, s.note))
    }

    pub fn sounding_voices(&self) -> usize { self.voices.len() }

    /// Every voice currently sounding, in ascending order.
    pub fn sounding_ids(&self) -> Vec<VoiceId> {
        self.voices.keys().copied().collect()
    }

    /// Close every sounding voice.  Returns how many could not be closed.
    pub fn silence_all(&mut self) -> usize {
        let voices: Vec<VoiceId> = self.voices.keys().copied().collect();
        voices.into_iter()
            .filter(|&v| self.note_off(v) == Delivery::Failed)
            .count()
    }

    // ── control changes ───────────────────────────────────────────────────

    /// Send a control change unless `value` is what the stream already holds.
    pub fn set_control(&mut self, channel: u8, control: u8, value: u8) -> Delivery {
        let key = ControlKey::new(channel, control);
        if !self.cache.is_fresh(key, value) {
            return Delivery::Skipped;
        }
        if !self.send(MidiMessage::control_change(channel, control, value)) {
            return Delivery::Failed;
        }
        self.cache.record(key, value);
        Delivery::Sent
    }

    /// Forget the last delivered value so the next one is always sent.
    pub fn forget_control(&mut self, channel: u8, control: u8) {
        self.cache.forget(ControlKey::new(channel, control));
    }

    pub fn control_value(&self, channel: u8, control: u8) -> Option<u8> {
        self.cache.get(ControlKey::new(channel, control))
    }

    // ── failures ──────────────────────────────────────────────────────────

    pub fn take_failures(&mut self) -> Vec<EmitFailure> {
        std::mem::take(&mut self.failures)
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("sink", &self.sink.name())
            .field("voices", &self.voices.len())
            .field("controls", &self.cache.len())
            .field("sent", &self.sent)
            .finish()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
