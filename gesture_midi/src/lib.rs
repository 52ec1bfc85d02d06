//! # gesture_midi
//!
//! The output half of a gesture controller.  Everything a policy decides
//! ends up as a [`MidiMessage`] pushed through an [`Emitter`], which keeps
//! two promises:
//!
//! * **No stuck notes**: note-on and note-off alternate per voice, and
//!   re-opening a sounding voice closes it first.
//! * **No redundant control changes**: a CC is only sent when its value
//!   differs from the last value actually delivered on that
//!   (channel, control) pair.
//!
//! Bookkeeping is only updated after the sink accepts a message, so a failed
//! send never leaves the emitter believing something it did not do.
//!
//! ## Quick start
//!
//! ```rust
//! use gesture_midi::{Emitter, MidiMessage, RecordingSink, VoiceId};
//!
//! let sink = RecordingSink::new();
//! let mut out = Emitter::new(Box::new(sink.clone()));
//!
//! out.note_on(VoiceId(0), 1, 60, 100);
//! out.set_control(1, 74, 10);
//! out.set_control(1, 74, 10);          // suppressed
//! out.note_on(VoiceId(0), 1, 62, 100); // closes 60 first
//! out.silence_all();
//!
//! assert_eq!(sink.messages(), vec![
//!     MidiMessage::note_on(1, 60, 100),
//!     MidiMessage::control_change(1, 74, 10),
//!     MidiMessage::note_off(1, 60),
//!     MidiMessage::note_on(1, 62, 100),
//!     MidiMessage::note_off(1, 62),
//! ]);
//! ```

use std::fmt;

pub mod cache;
pub mod emitter;
pub mod sink;
pub mod table;

pub use cache::{ControlKey, DebounceCache};
pub use emitter::{Delivery, EmitFailure, Emitter, VoiceId};
pub use sink::{LogSink, MidiSink, NullSink, RecordingSink, SendError};
pub use table::{presets, Chord, ChordQuality, HeightRange, ScaleTable, TableError};

/// Velocity used for every note-on the controllers emit.
pub const DEFAULT_VELOCITY: u8 = 100;

// ════════════════════════════════════════════════════════════════════════════
// MidiMessage
// ════════════════════════════════════════════════════════════════════════════

/// The three channel-voice messages a gesture controller emits.
///
/// Channels are 0-based (0–15); data bytes are 0–127.  Out-of-range values
/// are masked when encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MidiMessage {
    NoteOn        { channel: u8, note: u8, velocity: u8 },
    NoteOff       { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, control: u8, value: u8 },
}

impl MidiMessage {
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        MidiMessage::NoteOn { channel, note, velocity }
    }

    /// Note-off with release velocity 0.
    pub fn note_off(channel: u8, note: u8) -> Self {
        MidiMessage::NoteOff { channel, note, velocity: 0 }
    }

    pub fn control_change(channel: u8, control: u8, value: u8) -> Self {
        MidiMessage::ControlChange { channel, control, value }
    }

    pub fn channel(&self) -> u8 {
        match *self {
            MidiMessage::NoteOn { channel, .. }
            | MidiMessage::NoteOff { channel, .. }
            | MidiMessage::ControlChange { channel, .. } => channel,
        }
    }

    pub fn is_note_on(&self) -> bool { matches!(self, MidiMessage::NoteOn { .. }) }
    pub fn is_note_off(&self) -> bool { matches!(self, MidiMessage::NoteOff { .. }) }

    /// Raw wire bytes: status, data1, data2.
    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            MidiMessage::NoteOn { channel, note, velocity } =>
                [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOff { channel, note, velocity } =>
                [0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::ControlChange { channel, control, value } =>
                [0xB0 | (channel & 0x0F), control & 0x7F, value & 0x7F],
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOn { channel, note, velocity } =>
                write!(f, "note_on  ch={:<2} note={:<3} vel={}", channel, note, velocity),
            MidiMessage::NoteOff { channel, note, velocity } =>
                write!(f, "note_off ch={:<2} note={:<3} vel={}", channel, note, velocity),
            MidiMessage::ControlChange { channel, control, value } =>
                write!(f, "cc       ch={:<2} ctl={:<3} val={}", channel, control, value),
        }
    }
}

/// Linearly map `value` from `[min, max]` onto 0–127, truncating and
/// clamping.
pub fn scale_to_data_byte(value: f32, min: f32, max: f32) -> u8 {
    let span = max - min;
    if span == 0.0 || !span.is_finite() {
        return 0;
    }
    let scaled = ((value - min) / span * 127.0).trunc();
    scaled.clamp(0.0, 127.0) as u8
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
