//! Chord triggering with scale cycling.
//!
//! The left hand plays chords from the current table: entering the gate
//! sounds the chord under the hand, every downward strike after that
//! re-triggers (keeping the previous chord when the strike lands inside the
//! sticky zone), and leaving the gate stops it.  A clenching right hand
//! cycles to the next table and stops whatever is sounding; the left hand
//! picks the new table up on the following frame.
//!
//! A chord is sent as one note (the root) preceded by a control change that
//! selects its quality on the receiving instrument.

use std::time::Duration;

use tracing::{debug, info, warn};

use gesture_midi::{Chord, Delivery, Emitter, HeightRange, ScaleTable, VoiceId};
use hand_frame::{
    GrabLatch, GrabTest, HandGate, HandSample, HandTracker, RoleStrategy, Side, StrikeConfig,
    StrikeDetector, TrackingFrame, ZoneTest,
};

use super::Policy;
use crate::config::{ChordConfig, ConfigError};

const CHORD_VOICE: VoiceId = VoiceId(0);

/// Per-hand state of the chord player.
struct Player {
    /// Has the hand entered the gate since it was last stopped?
    engaged:    bool,
    strike:     StrikeDetector,
    last_chord: Option<Chord>,
}

impl Player {
    fn new(config: StrikeConfig) -> Self {
        Player { engaged: false, strike: StrikeDetector::new(config), last_chord: None }
    }

    fn disengage(&mut self) {
        self.engaged = false;
        self.strike.reset();
        self.last_chord = None;
    }
}

pub struct ChordPolicy {
    cfg:     ChordConfig,
    gate:    HandGate,
    range:   HeightRange,
    strike:  StrikeConfig,
    tables:  Vec<ScaleTable<Chord>>,
    current: usize,
    player:  HandTracker<Player>,
    cycler:  HandTracker<GrabLatch>,
}

impl ChordPolicy {
    pub fn new(cfg: ChordConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let tables = cfg.chord_tables()?;
        let range = cfg.height_range()?;
        Ok(ChordPolicy {
            gate:    HandGate::new(ZoneTest::new(cfg.radius), GrabTest::MutedAbove(cfg.mute_above)),
            strike:  StrikeConfig::new(cfg.strike_threshold)
                .cooldown(cfg.cooldown())
                .sticky_zone(cfg.sticky_zone),
            player:  HandTracker::new(RoleStrategy::Only(Side::Left)),
            cycler:  HandTracker::new(RoleStrategy::Only(Side::Right)),
            current: 0,
            range,
            tables,
            cfg,
        })
    }

    /// The table the chord hand is playing from.
    pub fn current_table(&self) -> &ScaleTable<Chord> {
        &self.tables[self.current]
    }

    fn step(&mut self, sample: &HandSample, now: Duration, out: &mut Emitter) {
        let active = self.gate.is_active(sample);
        let table = &self.tables[self.current];
        let Some(h) = self.player.get_mut(sample.id) else { return };
        let p = &mut h.state;

        if !active {
            if p.engaged {
                debug!(hand = %sample.id, "chord hand left gate");
                p.disengage();
                stop_chord(&self.cfg, out);
            }
            return;
        }

        let height = sample.height();
        if !p.engaged {
            // Entry only counts once the chord is sounding; a failed send is
            // retried on the next frame.
            let chord = table.quantize(height, &self.range);
            debug!(hand = %sample.id, height, %chord, "chord on entry");
            if play_chord(&self.cfg, chord, out) {
                p.engaged = true;
                p.strike.activate(height, now);
                p.last_chord = Some(chord);
            }
            return;
        }

        let Some(t) = p.strike.observe(height, now, true) else { return };
        let chord = match (t.sticky, p.last_chord) {
            (true, Some(prev)) => prev,
            _ => table.quantize(t.height, &self.range),
        };
        debug!(hand = %sample.id, height, %chord, "chord");
        if play_chord(&self.cfg, chord, out) {
            p.last_chord = Some(chord);
        }
    }

    fn next_table(&mut self, out: &mut Emitter) {
        self.current = (self.current + 1) % self.tables.len();
        info!(table = self.tables[self.current].name(), "chord table");
        for h in self.player.iter_mut() {
            h.state.disengage();
        }
        stop_chord(&self.cfg, out);
    }
}

/// Close the previous chord, select the quality, then sound the root.
/// Returns whether the chord is now sounding.
fn play_chord(cfg: &ChordConfig, chord: Chord, out: &mut Emitter) -> bool {
    if out.note_off(CHORD_VOICE) == Delivery::Failed {
        return false;
    }
    if out.set_control(cfg.channel, cfg.quality_control, chord.quality.cc_value()) == Delivery::Failed {
        warn!(%chord, "quality not selected, chord skipped");
        return false;
    }
    out.note_on(CHORD_VOICE, cfg.channel, chord.root, cfg.velocity).landed()
}

fn stop_chord(cfg: &ChordConfig, out: &mut Emitter) {
    out.note_off(CHORD_VOICE);
    out.forget_control(cfg.channel, cfg.quality_control);
}

impl Policy for ChordPolicy {
    fn name(&self) -> &'static str { "chords" }

    fn on_frame(&mut self, frame: &TrackingFrame, out: &mut Emitter) {
        let now = frame.timestamp();

        // ── chord hand ────────────────────────────────────────────────────
        let c = self.player.classify(frame);
        for id in c.disappeared {
            if self.player.release(id).is_some() {
                info!(hand = %id, "chord hand lost");
                stop_chord(&self.cfg, out);
            }
        }
        for sample in c.appeared {
            if self.player.adopt(sample, Player::new(self.strike)).is_none() {
                continue;
            }
            info!(hand = %sample.id, "chord hand");
            self.step(sample, now, out);
        }
        for sample in c.present {
            self.step(sample, now, out);
        }

        // ── scale hand ────────────────────────────────────────────────────
        let c = self.cycler.classify(frame);
        for id in c.disappeared {
            self.cycler.release(id);
        }
        for sample in c.appeared {
            let latch = GrabLatch::seeded(
                self.cfg.scale_grab,
                self.cfg.grab_release_gap,
                sample.grab_strength,
            );
            if self.cycler.adopt(sample, latch).is_some() {
                info!(hand = %sample.id, "scale hand");
            }
        }
        let mut cycles = 0;
        for sample in c.present {
            if let Some(h) = self.cycler.get_mut(sample.id) {
                if h.state.update(sample.grab_strength) {
                    cycles += 1;
                }
            }
        }
        for _ in 0..cycles {
            self.next_table(out);
        }
    }

    fn owns(&self, voice: VoiceId) -> bool {
        voice == CHORD_VOICE && self.player.iter().any(|h| h.state.engaged)
    }

    fn reset(&mut self, out: &mut Emitter) {
        if !self.player.release_all().is_empty() {
            stop_chord(&self.cfg, out);
        }
        self.cycler.release_all();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
