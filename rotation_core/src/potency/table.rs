//! Potency table - resolved potencies in the order they landed

use super::math::CombatStats;
use super::modifier::PotencyModifier;
use super::value::Potency;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resolved potencies, appended as their application events fire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PotencyTable {
    entries: Vec<Potency>,
}

impl PotencyTable {
    pub fn new() -> Self {
        PotencyTable { entries: Vec::new() }
    }

    pub fn push(&mut self, potency: Potency) {
        self.entries.push(potency);
    }

    pub fn entries(&self) -> &[Potency] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Potency> {
        self.entries.iter()
    }
}

/// Damage totals for one skill
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillDamage {
    pub hits: usize,
    pub total: f64,
}

/// Aggregate damage figures for a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageSummary {
    /// Sum of every resolved potency
    pub total_applied: f64,
    /// Snapshotted potencies still in flight
    pub total_pending: f64,
    /// Display time of the last applied hit
    pub last_application_time: Option<f64>,
    pub by_skill: BTreeMap<String, SkillDamage>,
}

impl DamageSummary {
    /// Summarize applied and pending potencies
    ///
    /// `party_buffs_at` supplies the externally reported modifiers active
    /// at a snapshot time.
    pub fn collect<'a, F>(
        applied: impl IntoIterator<Item = &'a Potency>,
        pending: impl IntoIterator<Item = &'a Potency>,
        stats: &CombatStats,
        tincture_multiplier: f64,
        party_buffs_at: F,
    ) -> Self
    where
        F: Fn(f64) -> Vec<PotencyModifier>,
    {
        let mut summary = DamageSummary::default();
        let amount = |p: &Potency| {
            let party = p.snapshot_time.map(&party_buffs_at).unwrap_or_default();
            p.amount(stats, tincture_multiplier, &party)
        };

        for p in applied {
            let value = amount(p);
            summary.total_applied += value;
            summary.last_application_time = p.application_time.or(summary.last_application_time);
            let entry = summary.by_skill.entry(p.source_skill.name.clone()).or_default();
            entry.hits += 1;
            entry.total += value;
        }
        for p in pending {
            summary.total_pending += amount(p);
        }
        summary
    }

    /// Applied damage per second over `duration` seconds of combat
    pub fn dps(&self, duration: f64) -> f64 {
        if duration <= 0.0 {
            return 0.0;
        }
        self.total_applied / duration
    }
}
