//! # hand_frame
//!
//! Sensor-independent model of tracked hands, plus the per-frame building
//! blocks that turn noisy hand poses into clean gesture decisions:
//!
//! * [`tracker`]: Appeared / Present / Disappeared classification of hand ids
//!   against the previous frame, with an arena of per-hand state.
//! * [`gate`]: pure zone and grab predicates, and a hysteresis grab latch.
//! * [`strike`]: the downward-strike re-trigger state machine.
//!
//! ## Coordinates
//!
//! Positions are millimetres in the sensor frame: `y` is height above the
//! device, `x` / `z` span the horizontal plane centred on it.
//!
//! ## Quick start
//!
//! ```rust
//! use hand_frame::{HandId, HandSample, Side, TrackingFrame, Vec3};
//! use std::time::Duration;
//!
//! let frame = TrackingFrame::new(
//!     Duration::from_millis(16),
//!     vec![HandSample::new(HandId(7), Side::Left, Vec3::new(0.0, 200.0, 0.0), 0.1)],
//! );
//! assert_eq!(frame.first_of(Side::Left).map(|h| h.id), Some(HandId(7)));
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod gate;
pub mod strike;
pub mod tracker;

pub use gate::{GrabLatch, GrabTest, HandGate, ZoneTest};
pub use strike::{StrikeConfig, StrikeDetector, StrikePhase, Trigger};
pub use tracker::{Classification, HandTracker, RoleStrategy, TrackedHand};

// ════════════════════════════════════════════════════════════════════════════
// HandId / Side
// ════════════════════════════════════════════════════════════════════════════

/// Sensor-provided identity of a hand, stable while the hand stays tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandId(pub u32);

impl fmt::Display for HandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Chirality reported by the sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn name(self) -> &'static str {
        match self {
            Side::Left  => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Vec3 / Axis
// ════════════════════════════════════════════════════════════════════════════

/// Palm position in millimetres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3 { x, y, z }
    }

    /// Distance from the vertical axis through the sensor.
    pub fn horizontal_distance(&self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    pub fn along(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// One coordinate axis of the sensor frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

// ════════════════════════════════════════════════════════════════════════════
// HandSample
// ════════════════════════════════════════════════════════════════════════════

/// One hand as seen in one frame.  Produced by the sensor, read-only here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandSample {
    pub id:            HandId,
    pub side:          Side,
    pub position:      Vec3,
    /// 0.0 = flat open hand, 1.0 = closed fist.
    pub grab_strength: f32,
}

impl HandSample {
    pub fn new(id: HandId, side: Side, position: Vec3, grab_strength: f32) -> Self {
        HandSample { id, side, position, grab_strength }
    }

    /// Palm height above the sensor (mm).
    pub fn height(&self) -> f32 {
        self.position.y
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TrackingFrame
// ════════════════════════════════════════════════════════════════════════════

/// Every hand visible at one sampling instant.
///
/// Frames carry their own timestamp so that every time-based rule
/// (e.g. strike cooldown) is reproducible from recorded input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingFrame {
    /// Microseconds since the source started.
    pub timestamp_us: u64,
    #[serde(default)]
    pub hands:        Vec<HandSample>,
}

impl TrackingFrame {
    pub fn new(timestamp: Duration, hands: Vec<HandSample>) -> Self {
        TrackingFrame {
            timestamp_us: timestamp.as_micros().min(u64::MAX as u128) as u64,
            hands,
        }
    }

    /// A frame with no hands in view.
    pub fn empty(timestamp: Duration) -> Self {
        TrackingFrame::new(timestamp, Vec::new())
    }

    pub fn timestamp(&self) -> Duration {
        Duration::from_micros(self.timestamp_us)
    }

    pub fn hand(&self, id: HandId) -> Option<&HandSample> {
        self.hands.iter().find(|h| h.id == id)
    }

    /// First hand of the given side in frame order.
    pub fn first_of(&self, side: Side) -> Option<&HandSample> {
        self.hands.iter().find(|h| h.side == side)
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
