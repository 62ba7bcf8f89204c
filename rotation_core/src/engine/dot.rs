//! DotTracker - which application of a damage-over-time is ticking

use crate::types::{ResourceKey, SkillKey};
use serde::{Deserialize, Serialize};

/// Seconds between damage-over-time ticks
pub const DOT_TICK_INTERVAL: f64 = 3.0;

/// The live application of one damage-over-time effect
///
/// Tick potencies are created up front when the effect is applied and stored
/// on the applying action's outcome; the tracker only remembers which of
/// them resolves next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DotTracker {
    pub resource: ResourceKey,
    pub skill: SkillKey,
    /// Record index of the applying action
    pub node: usize,
    /// Index of this application's first tick within the node's dot potencies
    first_tick: usize,
    total_ticks: usize,
    ticks_resolved: usize,
}

impl DotTracker {
    pub fn new(resource: ResourceKey, skill: SkillKey, node: usize, first_tick: usize, total_ticks: usize) -> Self {
        DotTracker {
            resource,
            skill,
            node,
            first_tick,
            total_ticks,
            ticks_resolved: 0,
        }
    }

    /// Number of ticks an effect of `duration` seconds deals
    pub fn tick_count(duration: f64) -> usize {
        (duration / DOT_TICK_INTERVAL).round() as usize
    }

    /// Index (within the node's dot potencies) of the next tick to resolve
    pub fn next_tick(&self) -> Option<usize> {
        if self.ticks_resolved < self.total_ticks {
            Some(self.first_tick + self.ticks_resolved)
        } else {
            None
        }
    }

    /// Record that the next tick landed
    pub fn advance(&mut self) {
        self.ticks_resolved = (self.ticks_resolved + 1).min(self.total_ticks);
    }

    /// Ticks still to come
    pub fn remaining_ticks(&self) -> usize {
        self.total_ticks - self.ticks_resolved
    }

    /// Number of the node's dot potencies to keep if this application ends now
    pub fn resolved_len(&self) -> usize {
        self.first_tick + self.ticks_resolved
    }

    pub fn is_active(&self) -> bool {
        self.remaining_ticks() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(total: usize) -> DotTracker {
        DotTracker::new(
            ResourceKey::job("demo", "burn"),
            SkillKey::new("demo", "ignite"),
            4,
            0,
            total,
        )
    }

    #[test]
    fn test_tick_count() {
        assert_eq!(DotTracker::tick_count(30.0), 10);
        assert_eq!(DotTracker::tick_count(24.0), 8);
    }

    #[test]
    fn test_ticks_run_out() {
        let mut dot = tracker(2);
        assert_eq!(dot.next_tick(), Some(0));
        dot.advance();
        assert_eq!(dot.next_tick(), Some(1));
        dot.advance();
        assert_eq!(dot.next_tick(), None);
        assert!(!dot.is_active());

        dot.advance();
        assert_eq!(dot.remaining_ticks(), 0);
    }

    #[test]
    fn test_resolved_len_offsets_first_tick() {
        let mut dot = DotTracker::new(
            ResourceKey::job("demo", "burn"),
            SkillKey::new("demo", "ignite"),
            4,
            10,
            10,
        );
        dot.advance();
        dot.advance();
        assert_eq!(dot.resolved_len(), 12);
    }
}
