//! Hand lifecycle tracking.
//!
//! [`HandTracker`] is an arena of per-hand state keyed by [`HandId`].  Each
//! frame it classifies the visible hands against what it already tracks:
//!
//! | Class | Meaning |
//! |---|---|
//! | Appeared | visible now, not tracked |
//! | Present | visible now, tracked |
//! | Disappeared | tracked, not visible now |
//!
//! Classification is pure.  The owning controller reacts to it and mutates
//! the arena explicitly with [`HandTracker::adopt`] and
//! [`HandTracker::release`].  A visible hand that is not adopted (its role is
//! already taken) shows up as Appeared again on the next frame.

use std::collections::BTreeMap;

use crate::{HandId, HandSample, Side, TrackingFrame};

// ════════════════════════════════════════════════════════════════════════════
// RoleStrategy
// ════════════════════════════════════════════════════════════════════════════

/// How a newly seen hand is given its role.  The role is fixed for as long as
/// the hand stays tracked; at most one tracked hand holds each role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleStrategy {
    /// Role is the hand's side; one left and one right hand at most.
    BySide,
    /// Only hands of this side are tracked, one at a time.
    Only(Side),
}

impl RoleStrategy {
    pub fn accepts(self, side: Side) -> bool {
        match self {
            RoleStrategy::BySide     => true,
            RoleStrategy::Only(only) => only == side,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TrackedHand / Classification
// ════════════════════════════════════════════════════════════════════════════

/// A hand owned by a controller, with whatever state that controller keeps.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedHand<S> {
    pub id:    HandId,
    pub role:  Side,
    pub state: S,
}

/// Three disjoint views of one frame relative to the tracked set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Classification<'f> {
    pub appeared:    Vec<&'f HandSample>,
    pub present:     Vec<&'f HandSample>,
    /// Ascending id order.
    pub disappeared: Vec<HandId>,
}

// ════════════════════════════════════════════════════════════════════════════
// HandTracker
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct HandTracker<S> {
    strategy: RoleStrategy,
    hands:    BTreeMap<HandId, TrackedHand<S>>,
}

impl<S> HandTracker<S> {
    pub fn new(strategy: RoleStrategy) -> Self {
        HandTracker { strategy, hands: BTreeMap::new() }
    }

    pub fn len(&self) -> usize { self.hands.len() }
    pub fn is_empty(&self) -> bool { self.hands.is_empty() }
    pub fn is_tracked(&self, id: HandId) -> bool { self.hands.contains_key(&id) }

    /// Classify `frame` against the tracked set.  Hands the strategy never
    /// accepts are left out entirely; a repeated id counts once.
    pub fn classify<'f>(&self, frame: &'f TrackingFrame) -> Classification<'f> {
        let mut out = Classification::default();
        let mut seen: Vec<HandId> = Vec::with_capacity(frame.hands.len());

        for hand in &frame.hands {
            if seen.contains(&hand.id) { continue; }
            seen.push(hand.id);

            if self.hands.contains_key(&hand.id) {
                out.present.push(hand);
            } else if self.strategy.accepts(hand.side) {
                out.appeared.push(hand);
            }
        }

        out.disappeared = self.hands.keys()
            .copied()
            .filter(|id| !seen.contains(id))
            .collect();
        out
    }

    /// The role `sample` would receive if adopted now, or `None` if the
    /// strategy rejects it or the role is already held.
    pub fn role_for(&self, sample: &HandSample) -> Option<Side> {
        if !self.strategy.accepts(sample.side) || self.hands.contains_key(&sample.id) {
            return None;
        }
        let role = sample.side;
        if self.holder_of(role).is_some() {
            return None;
        }
        Some(role)
    }

    /// Start tracking `sample` with initial `state`.  Returns `None` (and
    /// drops `state`) when no role is available.
    pub fn adopt(&mut self, sample: &HandSample, state: S) -> Option<&mut TrackedHand<S>> {
        let role = self.role_for(sample)?;
        let id = sample.id;
        self.hands.insert(id, TrackedHand { id, role, state });
        self.hands.get_mut(&id)
    }

    /// Stop tracking `id`, handing back its state.
    pub fn release(&mut self, id: HandId) -> Option<TrackedHand<S>> {
        self.hands.remove(&id)
    }

    pub fn get(&self, id: HandId) -> Option<&TrackedHand<S>> {
        self.hands.get(&id)
    }

    pub fn get_mut(&mut self, id: HandId) -> Option<&mut TrackedHand<S>> {
        self.hands.get_mut(&id)
    }

    /// The tracked hand currently holding `role`.
    pub fn holder_of(&self, role: Side) -> Option<&TrackedHand<S>> {
        self.hands.values().find(|h| h.role == role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedHand<S>> {
        self.hands.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackedHand<S>> {
        self.hands.values_mut()
    }

    /// Forget every hand, in ascending id order.
    pub fn release_all(&mut self) -> Vec<TrackedHand<S>> {
        std::mem::take(&mut self.hands).into_values().collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
