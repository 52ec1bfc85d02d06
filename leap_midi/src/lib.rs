//! # leap_midi
//!
//! LeapMotion hand-gesture controller emitting live MIDI.
//!
//! Frames come from a [`source::FrameSource`] running on its own thread and
//! are processed one at a time by an [`engine::Engine`], which hands each
//! frame to the active [`policy::Policy`] and delivers the result through a
//! [`gesture_midi::Emitter`].
//!
//! ## Policies
//!
//! | Policy | Left hand | Right hand |
//! |---|---|---|
//! | `cc` | held note, CC74 from palm x | held note, CC74 from palm height |
//! | `drums` | downward strike re-triggers note 60 | downward strike re-triggers note 20 |
//! | `chords` | strike plays chord under hand | fist cycles chord table |
//! | `lead` | height picks lead note | height change detunes (CC18) |
//!
//! ## Feature flags
//!
//! * (default): synthetic sweep and replayed frames; no hardware needed.
//! * `leap`: polls a real LeapMotion controller via LeapC.

pub mod config;
pub mod engine;
pub mod output;
pub mod policy;
pub mod source;

pub use config::{Config, ConfigError};
pub use engine::{Engine, FrameReport, RunStats};
pub use policy::{Policy, PolicyKind};
pub use source::{spawn_frame_source, FrameSource, ReplaySource, SourceError, SweepSource};
