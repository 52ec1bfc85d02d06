//! Spatial and grab gates.
//!
//! Gates are memoryless predicates evaluated fresh every frame.  Controllers
//! react to edges (gate opening / closing) themselves.  The one stateful
//! helper here is [`GrabLatch`], a hysteresis edge detector on grab strength.

use crate::HandSample;

// ════════════════════════════════════════════════════════════════════════════
// ZoneTest
// ════════════════════════════════════════════════════════════════════════════

/// Cylinder around the sensor's vertical axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoneTest {
    /// Millimetres.
    pub radius: f32,
}

impl ZoneTest {
    pub fn new(radius: f32) -> Self {
        ZoneTest { radius }
    }

    pub fn contains(&self, sample: &HandSample) -> bool {
        sample.position.horizontal_distance() < self.radius
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GrabTest
// ════════════════════════════════════════════════════════════════════════════

/// Condition on grab strength for a hand to count as active.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GrabTest {
    /// No grab condition.
    Any,
    /// Hand must be open: `grab < threshold`.
    OpenBelow(f32),
    /// Hand must not be a fist: a grab above `threshold` mutes.
    MutedAbove(f32),
}

impl GrabTest {
    pub fn passes(&self, grab_strength: f32) -> bool {
        match *self {
            GrabTest::Any          => true,
            GrabTest::OpenBelow(t) => grab_strength < t,
            GrabTest::MutedAbove(t) => !(grab_strength > t),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandGate: zone AND grab
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandGate {
    pub zone: ZoneTest,
    pub grab: GrabTest,
}

impl HandGate {
    pub fn new(zone: ZoneTest, grab: GrabTest) -> Self {
        HandGate { zone, grab }
    }

    pub fn is_active(&self, sample: &HandSample) -> bool {
        self.zone.contains(sample) && self.grab.passes(sample.grab_strength)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GrabLatch: rising-edge grab detector
// ════════════════════════════════════════════════════════════════════════════

/// Reports a single edge each time the hand closes past `threshold`.  The
/// latch re-arms only once grab strength drops below
/// `threshold - release_gap`, so a fist hovering near the threshold does not
/// chatter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrabLatch {
    threshold:   f32,
    release_gap: f32,
    engaged:     bool,
}

impl GrabLatch {
    pub fn new(threshold: f32, release_gap: f32) -> Self {
        GrabLatch { threshold, release_gap, engaged: false }
    }

    /// A latch for a hand first seen with `grab_strength`.  A hand that
    /// arrives already clenched must open before its grab counts.
    pub fn seeded(threshold: f32, release_gap: f32, grab_strength: f32) -> Self {
        GrabLatch { threshold, release_gap, engaged: grab_strength > threshold }
    }

    pub fn is_engaged(&self) -> bool { self.engaged }

    /// Feed one frame; returns `true` on the closing edge only.
    pub fn update(&mut self, grab_strength: f32) -> bool {
        if !self.engaged && grab_strength > self.threshold {
            self.engaged = true;
            return true;
        }
        if self.engaged && grab_strength < self.threshold - self.release_gap {
            self.engaged = false;
        }
        false
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HandId, Side, Vec3};

    fn at(x: f32, z: f32, grab: f32) -> HandSample {
        HandSample::new(HandId(1), Side::Left, Vec3::new(x, 150.0, z), grab)
    }

    #[test]
    fn zone_is_strict_radius() {
        let zone = ZoneTest::new(100.0);
        assert!(zone.contains(&at(60.0, 79.0, 0.0)));
        assert!(!zone.contains(&at(60.0, 80.0, 0.0))); // exactly 100
        assert!(!zone.contains(&at(0.0, -120.0, 0.0)));
    }

    #[test]
    fn open_hand_test() {
        let g = GrabTest::OpenBelow(0.2);
        assert!(g.passes(0.0));
        assert!(g.passes(0.19));
        assert!(!g.passes(0.2));
    }

    #[test]
    fn mute_fist_test() {
        let g = GrabTest::MutedAbove(0.9);
        assert!(g.passes(0.5));
        assert!(g.passes(0.9));
        assert!(!g.passes(0.95));
    }

    #[test]
    fn gate_needs_zone_and_grab() {
        let gate = HandGate::new(ZoneTest::new(120.0), GrabTest::OpenBelow(0.2));
        assert!(gate.is_active(&at(0.0, 0.0, 0.1)));
        assert!(!gate.is_active(&at(0.0, 0.0, 0.5)));
        assert!(!gate.is_active(&at(200.0, 0.0, 0.1)));
    }

    #[test]
    fn latch_fires_once_per_grab() {
        let mut l = GrabLatch::new(0.9, 0.2);
        assert!(!l.update(0.5));
        assert!(l.update(0.95));
        assert!(!l.update(1.0));
        assert!(!l.update(0.8)); // inside hysteresis band, still engaged
        assert!(!l.update(0.95));
        assert!(!l.update(0.6)); // released
        assert!(l.update(0.92));
    }

    #[test]
    fn seeded_latch_ignores_initial_fist() {
        let mut l = GrabLatch::seeded(0.9, 0.2, 1.0);
        assert!(l.is_engaged());
        assert!(!l.update(1.0));
        l.update(0.1);
        assert!(l.update(1.0));
    }
}
