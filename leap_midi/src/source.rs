//! Frame sources: LeapMotion hardware, replay files, and a synthetic sweep.
//!
//! Every source runs on its own thread and delivers [`TrackingFrame`]s over
//! an `mpsc` channel.  The engine at the other end does not know which kind
//! of source produced them.  A source stops when it runs out of frames or
//! when the receiving end hangs up.

use std::f32::consts::TAU;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info};

use hand_frame::{HandId, HandSample, Side, TrackingFrame, Vec3};

// ════════════════════════════════════════════════════════════════════════════
// SourceError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read {path}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: {source}")]
    Parse {
        line:   usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("tracking device: {0}")]
    Device(String),
}

// ════════════════════════════════════════════════════════════════════════════
// FrameSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`TrackingFrame`]s over a channel.
pub trait FrameSource: Send + 'static {
    fn name(&self) -> &'static str;

    /// Push frames until exhausted or the receiver is gone.
    fn run(self: Box<Self>, tx: Sender<TrackingFrame>) -> Result<(), SourceError>;
}

/// Spawn a frame source on its own thread and return the receiving end.
/// The join handle yields the source's own error, if it stopped on one.
pub fn spawn_frame_source(
    source: Box<dyn FrameSource>,
) -> (Receiver<TrackingFrame>, JoinHandle<Result<(), SourceError>>) {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let name = source.name();
        let result = source.run(tx);
        match &result {
            Ok(())   => info!(source = name, "frame source finished"),
            Err(err) => error!(source = name, %err, "frame source failed"),
        }
        result
    });
    (rx, handle)
}

// ════════════════════════════════════════════════════════════════════════════
// ReplaySource: newline-delimited JSON
// ════════════════════════════════════════════════════════════════════════════

/// Replays frames recorded one JSON object per line.  Blank lines are
/// skipped; the first malformed line stops the replay.
///
/// ```text
/// {"timestamp_us":0,"hands":[{"id":1,"side":"left","position":{"x":0,"y":200,"z":0},"grab_strength":0.0}]}
/// {"timestamp_us":16000,"hands":[]}
/// ```
pub struct ReplaySource {
    path: PathBuf,
    /// Sleep between frames to reproduce the recorded timing.
    realtime: bool,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ReplaySource { path: path.into(), realtime: false }
    }

    pub fn realtime(mut self, on: bool) -> Self {
        self.realtime = on;
        self
    }

    /// Parse every frame in `reader`.
    pub fn read_all<R: BufRead>(reader: R) -> Result<Vec<TrackingFrame>, SourceError> {
        let mut frames = Vec::new();
        for_each_frame(reader, Path::new("<reader>"), |f| {
            frames.push(f);
            true
        })?;
        Ok(frames)
    }
}

/// Feed each parsed frame to `f` until it returns `false`.
fn for_each_frame<R, F>(reader: R, path: &Path, mut f: F) -> Result<(), SourceError>
where
    R: BufRead,
    F: FnMut(TrackingFrame) -> bool,
{
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| SourceError::Io { path: path.to_path_buf(), source })?;
        if line.trim().is_empty() {
            continue;
        }
        let frame = serde_json::from_str(&line)
            .map_err(|source| SourceError::Parse { line: i + 1, source })?;
        if !f(frame) {
            break;
        }
    }
    Ok(())
}

impl FrameSource for ReplaySource {
    fn name(&self) -> &'static str { "replay" }

    fn run(self: Box<Self>, tx: Sender<TrackingFrame>) -> Result<(), SourceError> {
        let file = File::open(&self.path)
            .map_err(|source| SourceError::Io { path: self.path.clone(), source })?;
        info!(path = %self.path.display(), "replaying frames");

        let mut prev: Option<Duration> = None;
        for_each_frame(BufReader::new(file), &self.path, |frame| {
            if self.realtime {
                let ts = frame.timestamp();
                if let Some(p) = prev {
                    thread::sleep(ts.saturating_sub(p));
                }
                prev = Some(ts);
            }
            tx.send(frame).is_ok()
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SweepSource: synthetic hands, no hardware
// ════════════════════════════════════════════════════════════════════════════

/// One open hand per side, centred over the sensor, bobbing up and down on
/// a sine wave.  Useful for checking a MIDI setup without a controller.
#[derive(Clone, Debug)]
pub struct SweepSource {
    pub duration: Duration,
    pub fps:      u32,
    pub sides:    Vec<Side>,
    /// Lowest and highest palm height, in mm.
    pub low:      f32,
    pub high:     f32,
    /// Seconds per full up-and-down cycle.
    pub period:   f32,
    /// Sleep between frames so output happens in real time.
    pub paced:    bool,
}

impl Default for SweepSource {
    fn default() -> Self {
        SweepSource {
            duration: Duration::from_secs(10),
            fps:      60,
            sides:    vec![Side::Left, Side::Right],
            low:      80.0,
            high:     340.0,
            period:   2.0,
            paced:    true,
        }
    }
}

impl SweepSource {
    pub fn frame_count(&self) -> u64 {
        (self.duration.as_secs_f64() * self.fps.max(1) as f64) as u64
    }

    /// The frame at index `n`.  Hands on different sides move in opposite
    /// phase.
    pub fn frame_at(&self, n: u64) -> TrackingFrame {
        let step = Duration::from_secs(1) / self.fps.max(1);
        let t = step * n as u32;
        let mid = (self.low + self.high) / 2.0;
        let amp = (self.high - self.low) / 2.0;
        let phase = TAU * t.as_secs_f32() / self.period.max(f32::EPSILON);

        let hands = self.sides.iter().enumerate()
            .map(|(i, &side)| {
                let offset = if side == Side::Left { 0.0 } else { TAU / 2.0 };
                let y = mid + amp * (phase + offset).sin();
                HandSample::new(HandId(i as u32 + 1), side, Vec3::new(0.0, y, 0.0), 0.0)
            })
            .collect();
        TrackingFrame::new(t, hands)
    }
}

impl FrameSource for SweepSource {
    fn name(&self) -> &'static str { "sweep" }

    fn run(self: Box<Self>, tx: Sender<TrackingFrame>) -> Result<(), SourceError> {
        let step = Duration::from_secs(1) / self.fps.max(1);
        let total = self.frame_count();
        info!(frames = total, fps = self.fps, "sweep started");
        for n in 0..total {
            if tx.send(self.frame_at(n)).is_err() {
                debug!(frame = n, "receiver gone, sweep stopped");
                return Ok(());
            }
            if self.paced {
                thread::sleep(step);
            }
        }
        // Let every hand leave so the engine sees them go.
        let _ = tx.send(TrackingFrame::empty(step * total as u32));
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapSource: real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Frames from a LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// Timestamps are measured from when the source starts.
#[cfg(feature = "leap")]
pub struct LeapSource {
    /// Poll timeout, in milliseconds.
    pub poll_ms: u32,
}

#[cfg(feature = "leap")]
impl Default for LeapSource {
    fn default() -> Self {
        LeapSource { poll_ms: 100 }
    }
}

#[cfg(feature = "leap")]
impl FrameSource for LeapSource {
    fn name(&self) -> &'static str { "leap" }

    fn run(self: Box<Self>, tx: Sender<TrackingFrame>) -> Result<(), SourceError> {
        use leaprs::*;
        use std::time::Instant;

        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| SourceError::Device(format!("{e:?}")))?;
        connection.open().map_err(|e| SourceError::Device(format!("{e:?}")))?;
        info!("LeapMotion connection open");

        let start = Instant::now();
        loop {
            let msg = match connection.poll(self.poll_ms) {
                Ok(m)  => m,
                Err(e) => {
                    debug!(error = ?e, "LeapMotion poll failed");
                    continue;
                }
            };
            let Event::Tracking(data) = msg.event() else { continue };

            let hands = data.hands().iter()
                .map(|h| {
                    let side = match h.hand_type() {
                        HandType::Left  => Side::Left,
                        HandType::Right => Side::Right,
                    };
                    let p = h.palm().position();
                    HandSample::new(HandId(h.id()), side, Vec3::new(p.x(), p.y(), p.z()), h.grab_strength())
                })
                .collect();

            if tx.send(TrackingFrame::new(start.elapsed(), hands)).is_err() {
                return Ok(());
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const TWO_FRAMES: &str = r#"
{"timestamp_us":0,"hands":[{"id":1,"side":"left","position":{"x":0,"y":200,"z":0},"grab_strength":0.0}]}

{"timestamp_us":16000}
"#;

    // ── replay ────────────────────────────────────────────────────────────

    #[test]
    fn replay_parses_and_skips_blank_lines() {
        let frames = ReplaySource::read_all(Cursor::new(TWO_FRAMES)).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].hands[0].height(), 200.0);
        assert_eq!(frames[1].timestamp(), Duration::from_millis(16));
        assert!(frames[1].is_empty());
    }

    #[test]
    fn replay_reports_bad_line_number() {
        let text = "{\"timestamp_us\":0}\nnot json\n";
        match ReplaySource::read_all(Cursor::new(text)) {
            Err(SourceError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn replay_thread_delivers_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TWO_FRAMES.as_bytes()).unwrap();

        let (rx, handle) = spawn_frame_source(Box::new(ReplaySource::new(file.path())));
        let frames: Vec<_> = rx.iter().collect();
        assert_eq!(frames.len(), 2);
        assert!(handle.join().unwrap().is_ok());
    }

    #[test]
    fn missing_file_is_io_error() {
        let (rx, handle) = spawn_frame_source(Box::new(ReplaySource::new("/no/such/frames.jsonl")));
        assert_eq!(rx.iter().count(), 0);
        assert!(matches!(handle.join().unwrap(), Err(SourceError::Io { .. })));
    }

    // ── sweep ─────────────────────────────────────────────────────────────

    fn sweep() -> SweepSource {
        SweepSource { duration: Duration::from_millis(500), fps: 100, paced: false, ..Default::default() }
    }

    #[test]
    fn sweep_stays_in_band_with_opposite_phase() {
        let s = sweep();
        assert_eq!(s.frame_count(), 50);
        let f = s.frame_at(50);
        assert_eq!(f.timestamp(), Duration::from_millis(500));
        let l = f.first_of(Side::Left).unwrap().height();
        let r = f.first_of(Side::Right).unwrap().height();
        // Quarter period: left at the top, right at the bottom.
        assert!((l - 340.0).abs() < 0.01);
        assert!((r - 80.0).abs() < 0.01);
    }

    #[test]
    fn sweep_ends_with_empty_frame() {
        let (rx, handle) = spawn_frame_source(Box::new(sweep()));
        let frames: Vec<_> = rx.iter().collect();
        assert_eq!(frames.len(), 51);
        assert!(frames.last().unwrap().is_empty());
        assert!(handle.join().unwrap().is_ok());
    }

    #[test]
    fn sweep_stops_when_receiver_drops() {
        let s = SweepSource { duration: Duration::from_secs(3600), ..sweep() };
        let (rx, handle) = spawn_frame_source(Box::new(s));
        drop(rx);
        assert!(handle.join().unwrap().is_ok());
    }
}
