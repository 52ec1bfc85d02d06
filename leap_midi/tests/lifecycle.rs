//! Whole-sequence properties, checked for every policy.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gesture_midi::{Emitter, MidiMessage, RecordingSink};
use hand_frame::{HandId, HandSample, Side, TrackingFrame, Vec3};
use leap_midi::{spawn_frame_source, Config, Engine, PolicyKind, ReplaySource};

const ALL: [PolicyKind; 4] = [PolicyKind::Cc, PolicyKind::Drums, PolicyKind::Chords, PolicyKind::Lead];

fn engine(kind: PolicyKind) -> (Engine, RecordingSink) {
    let sink = RecordingSink::new();
    let policy = kind.build(&Config::default()).unwrap();
    (Engine::new(policy, Emitter::new(Box::new(sink.clone()))), sink)
}

/// A jittery performance: up to three hands drawn from a small id pool,
/// wandering in and out of view, ending with every hand gone.
fn performance(seed: u64, len: u64) -> Vec<TrackingFrame> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut frames: Vec<TrackingFrame> = (0..len)
        .map(|i| {
            let count = rng.gen_range(0..4);
            let hands = (0..count)
                .map(|_| {
                    let id: u32 = rng.gen_range(0..5);
                    let side = if id % 2 == 0 { Side::Left } else { Side::Right };
                    let pos = Vec3::new(
                        rng.gen_range(-130.0..130.0),
                        rng.gen_range(40.0..400.0),
                        rng.gen_range(-60.0..60.0),
                    );
                    let grab = if rng.gen_bool(1.0 / 3.0) {
                        rng.gen_range(0.85..=1.0)
                    } else {
                        rng.gen_range(0.0..0.3)
                    };
                    HandSample::new(HandId(id), side, pos, grab)
                })
                .collect();
            TrackingFrame::new(Duration::from_millis(i * 16), hands)
        })
        .collect();
    frames.push(TrackingFrame::empty(Duration::from_millis(len * 16)));
    frames
}

/// note-on count minus note-off count, per (channel, note).
fn balance(messages: &[MidiMessage]) -> HashMap<(u8, u8), i64> {
    let mut open: HashMap<(u8, u8), i64> = HashMap::new();
    for m in messages {
        match *m {
            MidiMessage::NoteOn { channel, note, .. }  => *open.entry((channel, note)).or_default() += 1,
            MidiMessage::NoteOff { channel, note, .. } => *open.entry((channel, note)).or_default() -= 1,
            MidiMessage::ControlChange { .. } => {}
        }
    }
    open.retain(|_, v| *v != 0);
    open
}

// ── no orphaned notes ─────────────────────────────────────────────────────

#[test]
fn every_note_is_closed_once_hands_are_gone() {
    for kind in ALL {
        for seed in 1..=8 {
            let (mut e, sink) = engine(kind);
            for f in performance(seed, 400) {
                e.process(&f);
            }
            assert_eq!(e.emitter().sounding_voices(), 0, "{kind} seed {seed}");
            assert!(balance(&sink.messages()).is_empty(), "{kind} seed {seed}");
        }
    }
}

#[test]
fn notes_alternate_on_off_per_voice() {
    // Never two note-ons on one channel without a note-off between them:
    // every policy here plays at most one note per channel at a time.
    for kind in ALL {
        let (mut e, sink) = engine(kind);
        for f in performance(42, 600) {
            e.process(&f);
        }
        let mut sounding: HashMap<u8, u8> = HashMap::new();
        for m in sink.messages() {
            match m {
                MidiMessage::NoteOn { channel, note, .. } => {
                    assert!(sounding.insert(channel, note).is_none(), "{kind}: double note-on");
                }
                MidiMessage::NoteOff { channel, note, .. } => {
                    assert_eq!(sounding.remove(&channel), Some(note), "{kind}: stray note-off");
                }
                MidiMessage::ControlChange { .. } => {}
            }
        }
        assert!(sounding.is_empty());
    }
}

#[test]
fn shutdown_mid_performance_leaves_nothing_sounding() {
    for kind in ALL {
        let (mut e, sink) = engine(kind);
        let mut frames = performance(7, 200);
        frames.pop();
        for f in &frames {
            e.process(f);
        }
        assert_eq!(e.shutdown(), 0);
        assert!(balance(&sink.messages()).is_empty(), "{kind}");
    }
}

// ── send failures ─────────────────────────────────────────────────────────

#[test]
fn intermittent_failures_never_orphan_a_note() {
    for kind in ALL {
        for seed in 1..=4 {
            let (mut e, sink) = engine(kind);
            let mut failed = 0;
            for (i, f) in performance(seed, 400).iter().enumerate() {
                if i % 5 == 0 {
                    sink.fail_next(1);
                }
                failed += e.process(f).failures.len();
            }
            sink.fail_next(0);
            e.shutdown();
            assert!(failed > 0, "{kind} seed {seed}: no failure was injected");
            assert_eq!(e.emitter().sounding_voices(), 0);
            assert!(balance(&sink.messages()).is_empty(), "{kind} seed {seed}");
        }
    }
}

#[test]
fn failed_note_offs_close_without_shutdown() {
    for kind in ALL {
        for seed in 1..=4 {
            let (mut e, sink) = engine(kind);
            for (i, f) in performance(seed, 400).iter().enumerate() {
                if i % 3 == 0 {
                    sink.fail_next(2);
                }
                e.process(f);
            }
            sink.fail_next(0);
            for i in 0..3 {
                e.process(&TrackingFrame::empty(Duration::from_millis(10_000 + i * 16)));
            }
            assert_eq!(e.emitter().sounding_voices(), 0, "{kind} seed {seed}");
            assert!(balance(&sink.messages()).is_empty(), "{kind} seed {seed}");
        }
    }
}

#[test]
fn failed_cc_is_sent_again_next_frame() {
    let (mut e, sink) = engine(PolicyKind::Cc);
    let at = |ms, x| {
        TrackingFrame::new(
            Duration::from_millis(ms),
            vec![HandSample::new(HandId(1), Side::Left, Vec3::new(x, 200.0, 0.0), 0.0)],
        )
    };
    e.process(&at(0, 0.0));
    sink.fail_next(1);
    let r = e.process(&at(16, 150.0));
    assert_eq!(r.failures.len(), 1);
    e.process(&at(32, 150.0));
    assert_eq!(sink.messages().last(), Some(&MidiMessage::control_change(8, 74, 127)));
}

// ── debounce ──────────────────────────────────────────────────────────────

#[test]
fn steady_hand_sends_each_control_once() {
    let (mut e, sink) = engine(PolicyKind::Cc);
    for i in 0..100 {
        e.process(&TrackingFrame::new(
            Duration::from_millis(i * 16),
            vec![
                HandSample::new(HandId(1), Side::Left, Vec3::new(20.0, 200.0, 0.0), 0.0),
                HandSample::new(HandId(2), Side::Right, Vec3::new(0.0, 180.0, 0.0), 0.0),
            ],
        ));
    }
    let ccs = sink.messages().iter()
        .filter(|m| matches!(m, MidiMessage::ControlChange { .. }))
        .count();
    assert_eq!(ccs, 2);
}

#[test]
fn repeated_frame_is_idempotent() {
    for kind in ALL {
        let (mut e, sink) = engine(kind);
        let frame = TrackingFrame::new(
            Duration::ZERO,
            vec![HandSample::new(HandId(1), Side::Left, Vec3::new(0.0, 210.0, 0.0), 0.0)],
        );
        e.process(&frame);
        let first = sink.messages().len();
        for i in 1..20 {
            e.process(&TrackingFrame { timestamp_us: i * 16_000, ..frame.clone() });
        }
        assert_eq!(sink.messages().len(), first, "{kind}");
    }
}

// ── end to end ────────────────────────────────────────────────────────────

#[test]
fn replayed_file_drives_engine_to_completion() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for f in performance(3, 120) {
        writeln!(file, "{}", serde_json::to_string(&f).unwrap()).unwrap();
    }

    let (rx, handle) = spawn_frame_source(Box::new(ReplaySource::new(file.path())));
    let (mut e, sink) = engine(PolicyKind::Drums);
    let stats = e.run(rx);

    assert!(handle.join().unwrap().is_ok());
    assert_eq!(stats.frames, 121);
    assert_eq!(stats.stuck, 0);
    assert_eq!(stats.sent, sink.messages().len() as u64);
    assert!(balance(&sink.messages()).is_empty());
}
