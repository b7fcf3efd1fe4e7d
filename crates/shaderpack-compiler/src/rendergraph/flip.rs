//! Ping-pong flip tracking
//!
//! A target is "flipped" when its most recent write went to the alt side.
//! Snapshots are persistent: taking one shares the tracker's current set, and
//! the next `flip` copies before mutating, so an earlier snapshot can never
//! observe later flips.

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Immutable set of flipped target indices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlipSet(Arc<BTreeSet<u32>>);

impl FlipSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, index: u32) -> bool {
        self.0.contains(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// Returns the indices of `self` that are not in `other`
    pub fn difference(&self, other: &BTreeSet<u32>) -> FlipSet {
        self.0.difference(other).copied().collect()
    }

    /// Inserts an index, copying the set first if a snapshot shares it
    pub fn insert(&mut self, index: u32) -> bool {
        Arc::make_mut(&mut self.0).insert(index)
    }

    /// Toggles an index, copying the set first if a snapshot shares it
    pub fn toggle(&mut self, index: u32) {
        let set = Arc::make_mut(&mut self.0);
        if !set.remove(&index) {
            set.insert(index);
        }
    }
}

impl FromIterator<u32> for FlipSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

impl Extend<u32> for FlipSet {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        Arc::make_mut(&mut self.0).extend(iter);
    }
}

/// Mutable flip state of the main color targets during forward simulation
///
/// Must be driven in strict program order; there is no undo.
#[derive(Debug, Clone, Default)]
pub struct FlipTracker {
    flipped: FlipSet,
}

impl FlipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current flipped set without copying it
    pub fn snapshot(&self) -> FlipSet {
        self.flipped.clone()
    }

    /// Toggles which physical side of a target is active
    pub fn flip(&mut self, index: u32) {
        self.flipped.toggle(index);
    }
}

/// Flip state a single pass is built against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlipState {
    flipped_before_pass: FlipSet,
    flipped_at_least_once: FlipSet,
    parity_swap: FlipSet,
}

impl FlipState {
    pub fn new(flipped_before_pass: FlipSet, flipped_at_least_once: FlipSet, parity_swap: FlipSet) -> Self {
        Self {
            flipped_before_pass,
            flipped_at_least_once,
            parity_swap,
        }
    }

    /// State of a registry that is never flipped
    pub fn unflipped() -> Self {
        Self::default()
    }

    pub fn is_flipped_before_pass(&self, index: u32) -> bool {
        self.flipped_before_pass.contains(index)
    }

    pub fn is_parity_swapped(&self, index: u32) -> bool {
        self.parity_swap.contains(index)
    }

    pub fn flipped_before_pass(&self) -> &FlipSet {
        &self.flipped_before_pass
    }

    pub fn flipped_at_least_once(&self) -> &FlipSet {
        &self.flipped_at_least_once
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_toggles_membership() {
        let mut tracker = FlipTracker::new();
        tracker.flip(3);
        assert!(tracker.snapshot().contains(3));

        tracker.flip(3);
        assert!(!tracker.snapshot().contains(3));
        assert!(tracker.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_is_not_affected_by_later_flips() {
        let mut tracker = FlipTracker::new();
        tracker.flip(0);
        let before = tracker.snapshot();

        tracker.flip(0);
        tracker.flip(1);

        assert_eq!(before.iter().collect::<Vec<_>>(), vec![0]);
        assert_eq!(tracker.snapshot().iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_difference() {
        let set: FlipSet = [0, 2, 4].into_iter().collect();
        let cleared = BTreeSet::from([0, 1, 2]);
        assert_eq!(set.difference(&cleared).iter().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn test_unflipped_state() {
        let state = FlipState::unflipped();
        for index in 0..16 {
            assert!(!state.is_flipped_before_pass(index));
            assert!(!state.is_parity_swapped(index));
        }
        assert!(state.flipped_at_least_once().is_empty());
    }
}
