//! Continuous CC policy.
//!
//! Each hand holds one note for as long as it is in view and streams one
//! axis of its palm position as a control change.  When a hand leaves, its
//! note is closed and its CC stream forgotten, so the next session starts by
//! sending a fresh value rather than trusting a stale one.

use tracing::{debug, info};

use gesture_midi::{scale_to_data_byte, Emitter, VoiceId};
use hand_frame::{HandSample, HandTracker, RoleStrategy, Side, TrackingFrame};

use super::{side_voice, Policy};
use crate::config::{AxisMapping, CcConfig, ConfigError};

pub struct CcPolicy {
    cfg:   CcConfig,
    hands: HandTracker<()>,
}

impl CcPolicy {
    pub fn new(cfg: CcConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(CcPolicy { cfg, hands: HandTracker::new(RoleStrategy::BySide) })
    }

    fn mapping(&self, role: Side) -> &AxisMapping {
        match role {
            Side::Left  => &self.cfg.left,
            Side::Right => &self.cfg.right,
        }
    }

    fn open(&self, role: Side, out: &mut Emitter) {
        let m = self.mapping(role);
        out.note_on(side_voice(role), m.channel, m.note, self.cfg.velocity);
    }

    fn close(&self, role: Side, out: &mut Emitter) {
        let m = self.mapping(role);
        out.note_off(side_voice(role));
        out.forget_control(m.channel, m.control);
    }

    fn update_cc(&self, role: Side, sample: &HandSample, out: &mut Emitter) {
        let m = self.mapping(role);
        let value = scale_to_data_byte(sample.position.along(m.axis), m.min, m.max);
        out.set_control(m.channel, m.control, value);
    }
}

impl Policy for CcPolicy {
    fn name(&self) -> &'static str { "cc" }

    fn on_frame(&mut self, frame: &TrackingFrame, out: &mut Emitter) {
        let c = self.hands.classify(frame);

        for id in c.disappeared {
            if let Some(h) = self.hands.release(id) {
                info!(hand = %id, role = %h.role, "hand lost, note off");
                self.close(h.role, out);
            }
        }

        for sample in c.appeared {
            let Some(role) = self.hands.adopt(sample, ()).map(|h| h.role) else {
                debug!(hand = %sample.id, side = %sample.side, "role taken, hand ignored");
                continue;
            };
            info!(hand = %sample.id, %role, "new hand, note on");
            self.open(role, out);
            self.update_cc(role, sample, out);
        }

        for sample in c.present {
            let Some(role) = self.hands.get(sample.id).map(|h| h.role) else { continue };
            // A note-on that failed earlier is retried while the hand stays.
            if !out.is_sounding(side_voice(role)) {
                self.open(role, out);
            }
            self.update_cc(role, sample, out);
        }
    }

    fn owns(&self, voice: VoiceId) -> bool {
        self.hands.iter().any(|h| side_voice(h.role) == voice)
    }

    fn reset(&mut self, out: &mut Emitter) {
        for h in self.hands.release_all() {
            self.close(h.role, out);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::testing::{emitter, frame, hand};
    use gesture_midi::MidiMessage;
    use hand_frame::{HandId, Vec3};

    fn policy() -> CcPolicy {
        CcPolicy::new(CcConfig::default()).unwrap()
    }

    fn left_at_x(id: u32, x: f32) -> HandSample {
        HandSample::new(HandId(id), Side::Left, Vec3::new(x, 200.0, 0.0), 0.0)
    }

    #[test]
    fn appear_opens_note_then_cc() {
        let (mut out, sink) = emitter();
        let mut p = policy();
        p.on_frame(&frame(0, vec![left_at_x(1, 0.0)]), &mut out);
        assert_eq!(sink.messages(), vec![
            MidiMessage::note_on(8, 60, 100),
            MidiMessage::control_change(8, 74, 63),
        ]);
    }

    #[test]
    fn right_hand_maps_height() {
        let (mut out, sink) = emitter();
        let mut p = policy();
        // (200 - 50) / 300 * 127 = 63.5 → 63
        p.on_frame(&frame(0, vec![hand(2, Side::Right, 200.0, 0.0)]), &mut out);
        assert_eq!(sink.messages()[1], MidiMessage::control_change(9, 74, 63));
    }

    #[test]
    fn unchanged_value_is_not_resent() {
        let (mut out, sink) = emitter();
        let mut p = policy();
        for t in 0..5 {
            p.on_frame(&frame(t * 16, vec![left_at_x(1, 0.0)]), &mut out);
        }
        assert_eq!(sink.messages().len(), 2);
        p.on_frame(&frame(100, vec![left_at_x(1, 150.0)]), &mut out);
        assert_eq!(sink.messages().last(), Some(&MidiMessage::control_change(8, 74, 127)));
    }

    #[test]
    fn loss_closes_note_and_forgets_cc() {
        let (mut out, sink) = emitter();
        let mut p = policy();
        p.on_frame(&frame(0, vec![left_at_x(1, 0.0)]), &mut out);
        p.on_frame(&frame(16, vec![]), &mut out);
        assert_eq!(sink.messages().last(), Some(&MidiMessage::note_off(8, 60)));
        assert_eq!(out.control_value(8, 74), None);

        // Same position again: the CC is sent afresh.
        sink.take();
        p.on_frame(&frame(32, vec![left_at_x(5, 0.0)]), &mut out);
        assert_eq!(sink.messages(), vec![
            MidiMessage::note_on(8, 60, 100),
            MidiMessage::control_change(8, 74, 63),
        ]);
    }

    #[test]
    fn second_hand_of_same_side_is_ignored() {
        let (mut out, sink) = emitter();
        let mut p = policy();
        p.on_frame(&frame(0, vec![left_at_x(1, 0.0), left_at_x(2, 100.0)]), &mut out);
        let ons = sink.messages().iter().filter(|m| m.is_note_on()).count();
        assert_eq!(ons, 1);
    }

    #[test]
    fn failed_note_on_is_retried_next_frame() {
        let (mut out, sink) = emitter();
        let mut p = policy();
        sink.fail_next(1);
        p.on_frame(&frame(0, vec![left_at_x(1, 0.0)]), &mut out);
        assert_eq!(sink.messages(), vec![MidiMessage::control_change(8, 74, 63)]);
        p.on_frame(&frame(16, vec![left_at_x(1, 0.0)]), &mut out);
        assert_eq!(sink.messages().last(), Some(&MidiMessage::note_on(8, 60, 100)));
    }

    #[test]
    fn reset_closes_everything() {
        let (mut out, sink) = emitter();
        let mut p = policy();
        p.on_frame(&frame(0, vec![left_at_x(1, 0.0), hand(2, Side::Right, 100.0, 0.0)]), &mut out);
        p.reset(&mut out);
        let offs = sink.messages().iter().filter(|m| m.is_note_off()).count();
        assert_eq!(offs, 2);
        assert_eq!(out.sounding_voices(), 0);
    }
}
