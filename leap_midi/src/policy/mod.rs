//! Policy controllers.
//!
//! Every policy has the same shape: one or more [`HandTracker`]s classify the
//! frame, a gate decides which hands count, a quantizer or strike detector
//! decides *what* to play, and the [`Emitter`] turns that into balanced MIDI.
//!
//! | Policy | Left hand | Right hand |
//! |---|---|---|
//! | [`CcPolicy`] | held note + CC from x | held note + CC from y |
//! | [`DrumPolicy`] | strike-triggered note | strike-triggered note |
//! | [`ChordPolicy`] | strike-triggered chords | grab cycles chord table |
//! | [`LeadPolicy`] | quantized lead pitch | relative detune CC |
//!
//! Within a frame, Disappeared hands are handled before Appeared ones so a
//! sensor id swap on the same side releases the role before re-assigning it.
//!
//! [`HandTracker`]: hand_frame::HandTracker

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use gesture_midi::{Emitter, VoiceId};
use hand_frame::{Side, TrackingFrame};

use crate::config::{Config, ConfigError};

pub mod cc;
pub mod chord;
pub mod drum;
pub mod lead;

pub use cc::CcPolicy;
pub use chord::ChordPolicy;
pub use drum::DrumPolicy;
pub use lead::LeadPolicy;

// ════════════════════════════════════════════════════════════════════════════
// Policy trait
// ════════════════════════════════════════════════════════════════════════════

/// One gesture → MIDI mapping.  Owns all per-hand state; the emitter owns
/// the output-side bookkeeping.
pub trait Policy: Send {
    fn name(&self) -> &'static str;

    /// Process one frame to completion.
    fn on_frame(&mut self, frame: &TrackingFrame, out: &mut Emitter);

    /// Does a live hand still hold `voice`?  A sounding voice nobody owns
    /// is left over from a failed note-off and gets closed by the engine.
    fn owns(&self, voice: VoiceId) -> bool;

    /// Close everything this policy has sounding and forget every hand.
    fn reset(&mut self, out: &mut Emitter);
}

// ════════════════════════════════════════════════════════════════════════════
// PolicyKind
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Continuous dual-hand CC mapping.
    Cc,
    /// Strike-triggered percussion.
    Drums,
    /// Chord triggering with scale cycling.
    Chords,
    /// Lead pitch plus relative detune.
    Lead,
}

impl PolicyKind {
    pub fn name(self) -> &'static str {
        match self {
            PolicyKind::Cc     => "cc",
            PolicyKind::Drums  => "drums",
            PolicyKind::Chords => "chords",
            PolicyKind::Lead   => "lead",
        }
    }

    /// Build the policy from its configuration section.
    pub fn build(self, cfg: &Config) -> Result<Box<dyn Policy>, ConfigError> {
        Ok(match self {
            PolicyKind::Cc     => Box::new(CcPolicy::new(cfg.cc.clone())?),
            PolicyKind::Drums  => Box::new(DrumPolicy::new(cfg.drums.clone())?),
            PolicyKind::Chords => Box::new(ChordPolicy::new(cfg.chords.clone())?),
            PolicyKind::Lead   => Box::new(LeadPolicy::new(cfg.lead.clone())?),
        })
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Voice for a per-side instrument.
pub(crate) fn side_voice(side: Side) -> VoiceId {
    match side {
        Side::Left  => VoiceId(0),
        Side::Right => VoiceId(1),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Test helpers
// ════════════════════════════════════════════════════════════════════════════
