//! Strike / re-trigger detection.
//!
//! Physical strikes overshoot and bounce, so "hand is below some height" is
//! useless as a trigger.  Instead the detector keeps a *reference height*
//! that ratchets up while the hand rises.  A trigger fires when the hand has
//! fallen more than `threshold` below that reference; the reference then
//! drops to the strike height, so the hand must rise again before the next
//! strike can fire.
//!
//! ```text
//!  height
//!    │    ╭╮ ← ratchet          ╭╮
//!    │   ╭╯╰╮                  ╭╯╰╮
//!    │  ╭╯  ╰╮  threshold     ╭╯  ╰╮
//!    │──╯    ╰──── ✱ fire ────╯    ╰── ✱ fire
//!    └──────────────────────────────────────── time
//! ```
//!
//! Evaluation order per frame:
//!
//! 1. inside the cooldown window since the last trigger → nothing at all;
//! 2. above the reference → reference := height;
//! 3. more than `threshold` below the reference → fire.
//!
//! The sticky zone tells the caller whether a trigger landed close enough to
//! the previous trigger height to replay the previous value instead of
//! re-quantizing.

use std::time::Duration;

use tracing::trace;

// ════════════════════════════════════════════════════════════════════════════
// StrikeConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrikeConfig {
    /// Downward travel (mm) from the reference needed to fire.
    pub threshold:   f32,
    /// Quiet period after any trigger (including activation).
    pub cooldown:    Duration,
    /// Height band (mm) around the last trigger in which the previous value
    /// is replayed.  `None` disables the rule.
    pub sticky_zone: Option<f32>,
}

impl StrikeConfig {
    pub fn new(threshold: f32) -> Self {
        StrikeConfig { threshold, cooldown: Duration::ZERO, sticky_zone: None }
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn sticky_zone(mut self, zone: f32) -> Self {
        self.sticky_zone = Some(zone);
        self
    }
}

// ════════════════════════════════════════════════════════════════════════════
// StrikePhase / Trigger
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrikePhase {
    /// No reference height yet.
    Idle,
    /// At or above the reference height.
    Ascending,
    /// Below the reference but not yet far enough to fire.
    ArmedForStrike,
}

/// A fired strike.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trigger {
    pub height: f32,
    /// Within the sticky zone of the previous trigger: replay its value.
    pub sticky: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// StrikeDetector
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct StrikeDetector {
    config:             StrikeConfig,
    phase:              StrikePhase,
    reference:          Option<f32>,
    last_played_height: Option<f32>,
    last_trigger:       Option<Duration>,
}

impl StrikeDetector {
    pub fn new(config: StrikeConfig) -> Self {
        StrikeDetector {
            config,
            phase:              StrikePhase::Idle,
            reference:          None,
            last_played_height: None,
            last_trigger:       None,
        }
    }

    pub fn config(&self) -> &StrikeConfig { &self.config }
    pub fn phase(&self) -> StrikePhase { self.phase }
    pub fn reference(&self) -> Option<f32> { self.reference }
    pub fn last_played_height(&self) -> Option<f32> { self.last_played_height }

    /// The hand has just started sounding at `height`.  Seeds the reference
    /// and starts the cooldown window, exactly as a trigger would.
    pub fn activate(&mut self, height: f32, now: Duration) {
        self.reference = Some(height);
        self.last_played_height = Some(height);
        self.last_trigger = Some(now);
        self.phase = StrikePhase::Ascending;
    }

    /// Back to `Idle`, forgetting all heights and the cooldown.
    pub fn reset(&mut self) {
        *self = StrikeDetector::new(self.config);
    }

    /// Is `now` still inside the cooldown window?
    pub fn cooling_down(&self, now: Duration) -> bool {
        match self.last_trigger {
            Some(t) => now.saturating_sub(t) < self.config.cooldown,
            None    => false,
        }
    }

    /// Feed one frame.  `armed = false` lets the reference ratchet but never
    /// fires (e.g. the hand is clenched or outside the zone).
    pub fn observe(&mut self, height: f32, now: Duration, armed: bool) -> Option<Trigger> {
        if self.cooling_down(now) {
            return None;
        }

        let reference = match self.reference {
            Some(r) => r,
            None => {
                self.reference = Some(height);
                self.phase = StrikePhase::Ascending;
                return None;
            }
        };

        if height > reference {
            self.reference = Some(height);
            self.phase = StrikePhase::Ascending;
            return None;
        }

        let downward = reference - height;
        if downward > self.config.threshold && armed {
            let sticky = match (self.config.sticky_zone, self.last_played_height) {
                (Some(zone), Some(last)) => (height - last).abs() <= zone,
                _ => false,
            };
            self.reference = Some(height);
            self.last_played_height = Some(height);
            self.last_trigger = Some(now);
            self.phase = StrikePhase::Ascending;
            trace!(height, downward, sticky, "strike");
            return Some(Trigger { height, sticky });
        }

        self.phase = if downward > 0.0 { StrikePhase::ArmedForStrike } else { StrikePhase::Ascending };
        None
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration { Duration::from_millis(n) }

    fn detector(threshold: f32) -> StrikeDetector {
        StrikeDetector::new(StrikeConfig::new(threshold))
    }

    #[test]
    fn starts_idle() {
        let d = detector(30.0);
        assert_eq!(d.phase(), StrikePhase::Idle);
        assert_eq!(d.reference(), None);
    }

    #[test]
    fn first_observation_seeds_reference() {
        let mut d = detector(30.0);
        assert_eq!(d.observe(100.0, ms(0), true), None);
        assert_eq!(d.reference(), Some(100.0));
        // Even a huge drop right after seeding fires only relative to it.
        assert!(d.observe(50.0, ms(10), true).is_some());
    }

    #[test]
    fn ratchet_scenario() {
        let mut d = detector(30.0);
        d.activate(200.0, ms(0));

        let t = d.observe(165.0, ms(100), true).expect("35mm drop fires");
        assert_eq!(t.height, 165.0);
        assert_eq!(d.reference(), Some(165.0));

        assert_eq!(d.observe(180.0, ms(200), true), None);
        assert_eq!(d.reference(), Some(180.0));

        assert!(d.observe(145.0, ms(300), true).is_some());
    }

    #[test]
    fn no_trigger_within_threshold() {
        let mut d = detector(30.0);
        d.activate(200.0, ms(0));
        assert_eq!(d.observe(175.0, ms(10), true), None);
        assert_eq!(d.phase(), StrikePhase::ArmedForStrike);
        assert_eq!(d.observe(170.0, ms(20), true), None); // exactly 30, not > 30
        assert!(d.observe(169.0, ms(30), true).is_some());
    }

    #[test]
    fn held_low_fires_once() {
        let mut d = detector(30.0);
        d.activate(200.0, ms(0));
        let fired = (1..20)
            .filter_map(|i| d.observe(150.0, ms(i * 10), true))
            .count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn rise_resets_baseline() {
        let mut d = detector(30.0);
        d.activate(200.0, ms(0));
        assert!(d.observe(160.0, ms(10), true).is_some());
        // Still descending from the new baseline, only 25mm more.
        assert_eq!(d.observe(135.0, ms(20), true), None);
        // Rise, then a fresh 35mm drop fires.
        assert_eq!(d.observe(190.0, ms(30), true), None);
        assert!(d.observe(155.0, ms(40), true).is_some());
    }

    #[test]
    fn cooldown_vetoes_second_strike() {
        let mut d = StrikeDetector::new(StrikeConfig::new(15.0).cooldown(ms(200)));
        d.activate(200.0, ms(0));
        // Inside the activation cooldown nothing happens, not even a ratchet.
        assert_eq!(d.observe(150.0, ms(100), true), None);
        assert_eq!(d.observe(250.0, ms(150), true), None);
        assert_eq!(d.reference(), Some(200.0));

        assert!(d.observe(180.0, ms(210), true).is_some());
        // Second downstroke 100ms later is vetoed.
        assert_eq!(d.observe(220.0, ms(250), true), None);
        assert_eq!(d.observe(150.0, ms(310), true), None);
        assert!(d.cooling_down(ms(409)));
        assert!(!d.cooling_down(ms(410)));
    }

    #[test]
    fn two_strikes_inside_cooldown_yield_one_trigger() {
        let mut d = StrikeDetector::new(StrikeConfig::new(20.0).cooldown(ms(200)));
        d.activate(300.0, ms(0));
        let heights = [(250, 300.0), (260, 250.0), (300, 320.0), (340, 270.0)];
        let fired = heights.iter()
            .filter_map(|&(t, h)| d.observe(h, ms(t), true))
            .count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn disarmed_never_fires_but_ratchets() {
        let mut d = detector(30.0);
        d.activate(200.0, ms(0));
        assert_eq!(d.observe(100.0, ms(10), false), None);
        assert_eq!(d.reference(), Some(200.0));
        assert_eq!(d.observe(260.0, ms(20), false), None);
        assert_eq!(d.reference(), Some(260.0));
    }

    #[test]
    fn sticky_zone_replays_near_last_trigger() {
        let mut d = StrikeDetector::new(StrikeConfig::new(15.0).sticky_zone(20.0));
        d.activate(250.0, ms(0));
        let t = d.observe(165.0, ms(10), true).unwrap();
        assert!(!t.sticky);
        assert_eq!(d.last_played_height(), Some(165.0));

        d.observe(200.0, ms(20), true);
        let t = d.observe(175.0, ms(30), true).unwrap();
        assert!(t.sticky);
        assert_eq!(d.last_played_height(), Some(175.0));
    }

    #[test]
    fn no_sticky_zone_never_sticky() {
        let mut d = detector(10.0);
        d.activate(100.0, ms(0));
        assert_eq!(d.observe(85.0, ms(1), true).map(|t| t.sticky), Some(false));
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut d = StrikeDetector::new(StrikeConfig::new(10.0).cooldown(ms(500)));
        d.activate(100.0, ms(0));
        d.reset();
        assert_eq!(d.phase(), StrikePhase::Idle);
        assert!(!d.cooling_down(ms(1)));
    }
}
