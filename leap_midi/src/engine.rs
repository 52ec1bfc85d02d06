//! The frame-processing engine.
//!
//! An [`Engine`] owns one policy and one [`Emitter`] and processes frames
//! strictly one at a time.  It is the single consumer at the end of the
//! source channel; nothing else touches policy or output state.
//!
//! After the policy has seen a frame, any voice still sounding that no live
//! hand owns (its note-off failed when the hand went away) is closed again.
//! That repeats every frame until the note-off lands.

use std::sync::mpsc::Receiver;
use std::time::Duration;

use tracing::{debug, info, warn};

use gesture_midi::{EmitFailure, Emitter};
use hand_frame::TrackingFrame;

use crate::policy::Policy;

// ════════════════════════════════════════════════════════════════════════════
// FrameReport / RunStats
// ════════════════════════════════════════════════════════════════════════════

/// What happened while processing one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// 1-based index of the frame since the engine started.
    pub frame:    u64,
    pub failures: Vec<EmitFailure>,
}

impl FrameReport {
    pub fn is_clean(&self) -> bool { self.failures.is_empty() }
}

/// Totals for one [`Engine::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames:   u64,
    pub sent:     u64,
    pub failures: u64,
    /// Voices that could not be closed at shutdown.
    pub stuck:    usize,
}

// ════════════════════════════════════════════════════════════════════════════
// Engine
// ════════════════════════════════════════════════════════════════════════════

pub struct Engine {
    policy:         Box<dyn Policy>,
    out:            Emitter,
    frames:         u64,
    failures:       u64,
    last_timestamp: Option<Duration>,
}

impl Engine {
    pub fn new(policy: Box<dyn Policy>, out: Emitter) -> Self {
        Engine { policy, out, frames: 0, failures: 0, last_timestamp: None }
    }

    pub fn policy_name(&self) -> &'static str { self.policy.name() }
    pub fn frames(&self) -> u64 { self.frames }
    pub fn emitter(&self) -> &Emitter { &self.out }

    /// Run the policy over one frame.
    pub fn process(&mut self, frame: &TrackingFrame) -> FrameReport {
        let ts = frame.timestamp();
        if let Some(prev) = self.last_timestamp {
            if ts < prev {
                warn!(?prev, now = ?ts, "frame timestamp went backwards");
            }
        }
        self.last_timestamp = Some(ts);
        self.frames += 1;

        self.policy.on_frame(frame, &mut self.out);
        self.close_orphans();

        let failures = self.out.take_failures();
        self.failures += failures.len() as u64;
        if !failures.is_empty() {
            debug!(frame = self.frames, count = failures.len(), "send failures");
        }
        FrameReport { frame: self.frames, failures }
    }

    fn close_orphans(&mut self) {
        for voice in self.out.sounding_ids() {
            if !self.policy.owns(voice) {
                debug!(%voice, "closing voice no hand owns");
                self.out.note_off(voice);
            }
        }
    }

    /// Release every hand and close every sounding voice.  Returns how many
    /// voices could not be closed.
    pub fn shutdown(&mut self) -> usize {
        self.policy.reset(&mut self.out);
        let stuck = self.out.silence_all();
        self.failures += self.out.take_failures().len() as u64;
        if stuck > 0 {
            warn!(stuck, "voices left sounding after shutdown");
        }
        stuck
    }

    /// Consume frames until the channel closes, then shut down.
    pub fn run(&mut self, rx: Receiver<TrackingFrame>) -> RunStats {
        info!(policy = self.policy.name(), sink = self.out.sink_name(), "engine running");
        for frame in rx {
            self.process(&frame);
        }
        let stuck = self.shutdown();
        let stats = RunStats {
            frames:   self.frames,
            sent:     self.out.sent_count(),
            failures: self.failures,
            stuck,
        };
        info!(frames = stats.frames, sent = stats.sent, failures = stats.failures, "engine stopped");
        stats
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
