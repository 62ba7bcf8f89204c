//! Derived per-action values, rebuilt on every replay

use crate::potency::Potency;
use crate::types::SkillKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What one skill action turned into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutcome {
    pub skill: SkillKey,
    /// Display time the action was requested
    pub start_lock_time: f64,
    /// Display time the next action could start, as far as this one is concerned
    pub end_lock_time: f64,
    pub cast_time: f64,
    pub potency: Option<Potency>,
    pub dot_potencies: Vec<Potency>,
}

impl NodeOutcome {
    pub fn new(skill: SkillKey, start_lock_time: f64, end_lock_time: f64, cast_time: f64) -> Self {
        NodeOutcome {
            skill,
            start_lock_time,
            end_lock_time,
            cast_time,
            potency: None,
            dot_potencies: Vec::new(),
        }
    }

    /// Every potency this action produced
    pub fn potencies(&self) -> impl Iterator<Item = &Potency> {
        self.potency.iter().chain(self.dot_potencies.iter())
    }
}

/// Outcomes keyed by record index
///
/// Owned by the engine, so a fresh replay always starts from an empty
/// cache and nothing stale survives a rewind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedCache {
    outcomes: BTreeMap<usize, NodeOutcome>,
}

impl DerivedCache {
    pub fn new() -> Self {
        DerivedCache {
            outcomes: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, node: usize, outcome: NodeOutcome) {
        self.outcomes.insert(node, outcome);
    }

    pub fn get(&self, node: usize) -> Option<&NodeOutcome> {
        self.outcomes.get(&node)
    }

    pub fn get_mut(&mut self, node: usize) -> Option<&mut NodeOutcome> {
        self.outcomes.get_mut(&node)
    }

    pub fn potency_mut(&mut self, node: usize) -> Option<&mut Potency> {
        self.outcomes.get_mut(&node)?.potency.as_mut()
    }

    /// Drop the not-yet-ticked potencies of a damage-over-time application
    pub fn truncate_dot(&mut self, node: usize, keep: usize) {
        if let Some(outcome) = self.outcomes.get_mut(&node) {
            outcome.dot_potencies.truncate(keep);
        }
    }

    /// Snapshotted potencies that have not landed yet
    pub fn pending(&self) -> impl Iterator<Item = &Potency> {
        self.outcomes
            .values()
            .flat_map(|o| o.potencies())
            .filter(|p| p.has_snapshotted() && !p.has_resolved())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &NodeOutcome)> {
        self.outcomes.iter()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
