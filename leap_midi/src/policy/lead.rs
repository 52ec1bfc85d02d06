//! Lead pitch plus relative detune.
//!
//! The left hand plays a monophonic line: its height picks a note from the
//! pitch table and the note is re-struck whenever the pick changes.  The
//! right hand bends the line with a control change measured from wherever
//! that hand first appeared, so it always starts at the centre value.

use tracing::{debug, info};

use gesture_midi::{Delivery, Emitter, HeightRange, ScaleTable, VoiceId};
use hand_frame::{GrabTest, HandGate, HandTracker, RoleStrategy, Side, TrackingFrame, ZoneTest};

use super::Policy;
use crate::config::{ConfigError, LeadConfig};

const LEAD_VOICE: VoiceId = VoiceId(0);

/// Full detune swing either side of the centre value.
const DETUNE_SWING: f32 = 63.0;

pub struct LeadPolicy {
    cfg:     LeadConfig,
    gate:    HandGate,
    range:   HeightRange,
    pitches: ScaleTable<u8>,
    /// Note the pitch hand last sounded.
    pitch:   HandTracker<Option<u8>>,
    /// Height the detune hand started from.
    detune:  HandTracker<f32>,
}

impl LeadPolicy {
    pub fn new(cfg: LeadConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(LeadPolicy {
            gate:    HandGate::new(ZoneTest::new(cfg.radius), GrabTest::MutedAbove(cfg.mute_above)),
            range:   cfg.height_range()?,
            pitches: cfg.pitch_table()?,
            pitch:   HandTracker::new(RoleStrategy::Only(Side::Left)),
            detune:  HandTracker::new(RoleStrategy::Only(Side::Right)),
            cfg,
        })
    }

    /// Detune value for a hand `dy` millimetres above its start height.
    pub fn detune_value(&self, dy: f32) -> u8 {
        let v = self.cfg.detune_center as f32 + dy / self.cfg.detune_span * DETUNE_SWING;
        (v as i32).clamp(0, 127) as u8
    }

    fn centre_detune(&self, out: &mut Emitter) {
        out.set_control(self.cfg.channel, self.cfg.detune_control, self.cfg.detune_center);
    }
}

impl Policy for LeadPolicy {
    fn name(&self) -> &'static str { "lead" }

    fn on_frame(&mut self, frame: &TrackingFrame, out: &mut Emitter) {
        // ── pitch hand ────────────────────────────────────────────────────
        let c = self.pitch.classify(frame);
        for id in c.disappeared {
            if self.pitch.release(id).is_some() {
                info!(hand = %id, "lead hand lost");
                out.note_off(LEAD_VOICE);
            }
        }
        let mut live = c.present;
        for sample in c.appeared {
            if self.pitch.adopt(sample, None).is_some() {
                info!(hand = %sample.id, "lead hand");
                live.push(sample);
            }
        }
        for sample in live {
            let active = self.gate.is_active(sample);
            let Some(h) = self.pitch.get_mut(sample.id) else { continue };

            if !active {
                if h.state.is_some() && out.note_off(LEAD_VOICE) != Delivery::Failed {
                    h.state = None;
                }
                continue;
            }
            let note = self.pitches.quantize(sample.height(), &self.range);
            if h.state != Some(note) {
                debug!(hand = %sample.id, note, "lead note");
                if out.note_on(LEAD_VOICE, self.cfg.channel, note, self.cfg.velocity).landed() {
                    h.state = Some(note);
                }
            }
        }

        // ── detune hand ───────────────────────────────────────────────────
        let c = self.detune.classify(frame);
        for id in c.disappeared {
            if self.detune.release(id).is_some() {
                info!(hand = %id, "detune hand lost, recentre");
                self.centre_detune(out);
            }
        }
        for sample in c.appeared {
            if self.detune.adopt(sample, sample.height()).is_some() {
                info!(hand = %sample.id, start = sample.height(), "detune hand");
                self.centre_detune(out);
            }
        }
        for sample in c.present {
            let Some(start) = self.detune.get(sample.id).map(|h| h.state) else { continue };
            let value = self.detune_value(sample.height() - start);
            out.set_control(self.cfg.channel, self.cfg.detune_control, value);
        }
    }

    fn owns(&self, voice: VoiceId) -> bool {
        voice == LEAD_VOICE && self.pitch.iter().any(|h| h.state.is_some())
    }

    fn reset(&mut self, out: &mut Emitter) {
        if !self.pitch.release_all().is_empty() {
            out.note_off(LEAD_VOICE);
        }
        if !self.detune.release_all().is_empty() {
            self.centre_detune(out);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
