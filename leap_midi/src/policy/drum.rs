//! Strike-triggered percussion.
//!
//! A hand becomes a drumstick the first frame it is open and inside the
//! playing zone.  From then on every downward strike re-triggers its note,
//! but only while the hand is still open and in the zone.  Leaving the zone
//! does not end the voice; only losing sight of the hand does.

use tracing::{debug, info};

use gesture_midi::{Emitter, VoiceId};
use hand_frame::{
    GrabTest, HandGate, HandTracker, RoleStrategy, Side, StrikeConfig, StrikeDetector,
    TrackingFrame, ZoneTest,
};

use super::{side_voice, Policy};
use crate::config::{ConfigError, DrumConfig, NoteSlot};

struct Stick {
    strike: StrikeDetector,
}

pub struct DrumPolicy {
    cfg:    DrumConfig,
    gate:   HandGate,
    strike: StrikeConfig,
    hands:  HandTracker<Stick>,
}

impl DrumPolicy {
    pub fn new(cfg: DrumConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(DrumPolicy {
            gate:   HandGate::new(ZoneTest::new(cfg.radius), GrabTest::OpenBelow(cfg.open_below)),
            strike: StrikeConfig::new(cfg.strike_threshold).cooldown(cfg.cooldown()),
            hands:  HandTracker::new(RoleStrategy::BySide),
            cfg,
        })
    }

    fn slot(&self, role: Side) -> NoteSlot {
        match role {
            Side::Left  => self.cfg.left,
            Side::Right => self.cfg.right,
        }
    }

    fn hit(&self, role: Side, out: &mut Emitter) {
        let s = self.slot(role);
        out.note_on(side_voice(role), s.channel, s.note, self.cfg.velocity);
    }
}

impl Policy for DrumPolicy {
    fn name(&self) -> &'static str { "drums" }

    fn on_frame(&mut self, frame: &TrackingFrame, out: &mut Emitter) {
        let now = frame.timestamp();
        let c = self.hands.classify(frame);

        for id in c.disappeared {
            if let Some(h) = self.hands.release(id) {
                info!(hand = %id, role = %h.role, "hand lost, note off");
                out.note_off(side_voice(h.role));
            }
        }

        for sample in c.appeared {
            if !self.gate.is_active(sample) {
                continue;
            }
            let mut strike = StrikeDetector::new(self.strike);
            strike.activate(sample.height(), now);
            let Some(role) = self.hands.adopt(sample, Stick { strike }).map(|h| h.role) else {
                continue;
            };
            info!(hand = %sample.id, %role, "hand activated in zone");
            self.hit(role, out);
        }

        for sample in c.present {
            let armed = self.gate.is_active(sample);
            let Some(h) = self.hands.get_mut(sample.id) else { continue };
            let role = h.role;
            let fired = h.state.strike.observe(sample.height(), now, armed);
            if let Some(t) = fired {
                debug!(hand = %sample.id, height = t.height, "strike");
                self.hit(role, out);
            }
        }
    }

    fn owns(&self, voice: VoiceId) -> bool {
        self.hands.iter().any(|h| side_voice(h.role) == voice)
    }

    fn reset(&mut self, out: &mut Emitter) {
        for h in self.hands.release_all() {
            out.note_off(side_voice(h.role));
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
