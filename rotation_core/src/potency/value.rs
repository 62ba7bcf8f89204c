//! Potency - one frozen damage value on its way to the target

use super::math::{calculate_damage, CombatStats};
use super::modifier::{compute_potency, ModifierKind, PotencyModifier};
use crate::types::SkillKey;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A damage value created by a skill
///
/// A potency is pending between its snapshot and its application; once
/// `application_time` is set it is resolved and never changes again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Potency {
    pub source_skill: SkillKey,
    /// Record index of the action that produced this potency
    pub node: Option<usize>,
    /// Display time at which the action was requested
    pub source_time: f64,
    pub description: String,
    pub base: f64,
    pub modifiers: Vec<PotencyModifier>,
    pub snapshot_time: Option<f64>,
    pub application_time: Option<f64>,
}

impl Potency {
    pub fn new(source_skill: SkillKey, node: Option<usize>, source_time: f64, base: f64) -> Self {
        Potency {
            description: source_skill.name.clone(),
            source_skill,
            node,
            source_time,
            base,
            modifiers: Vec::new(),
            snapshot_time: None,
            application_time: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Freeze the modifiers active right now
    pub fn snapshot(&mut self, display_time: f64, modifiers: Vec<PotencyModifier>) {
        self.snapshot_time = Some(display_time);
        self.modifiers = modifiers;
    }

    /// Mark the potency as delivered
    pub fn resolve(&mut self, display_time: f64) {
        if self.application_time.is_some() {
            warn!(skill = %self.source_skill, "potency resolved twice");
            return;
        }
        debug_assert!(self.snapshot_time.is_some(), "resolving a potency that never snapshotted");
        self.application_time = Some(display_time);
    }

    pub fn has_snapshotted(&self) -> bool {
        self.snapshot_time.is_some()
    }

    pub fn has_resolved(&self) -> bool {
        self.application_time.is_some()
    }

    /// Expected damage of this potency in potency units
    ///
    /// `party_buffs` are extra modifiers active at the snapshot instant that
    /// were not captured by the engine (externally reported buffs).
    pub fn amount(&self, stats: &CombatStats, tincture_multiplier: f64, party_buffs: &[PotencyModifier]) -> f64 {
        let modifiers: Vec<PotencyModifier> = self.modifiers.iter().chain(party_buffs).cloned().collect();
        let mut tincture = 1.0;
        let mut crit_bonus = 0.0;
        let mut dh_bonus = 0.0;
        let mut auto_crit = false;
        let mut auto_cdh = false;
        let mut no_cdh = false;

        for m in &modifiers {
            match m.kind {
                ModifierKind::Multiplier { .. } | ModifierKind::Adder { .. } => {}
                ModifierKind::CritDirect { crit_bonus: c, dh_bonus: d } => {
                    crit_bonus += c;
                    dh_bonus += d;
                }
                ModifierKind::AutoCrit => auto_crit = true,
                ModifierKind::AutoCritDirect => auto_cdh = true,
                ModifierKind::NoCritDirect => no_cdh = true,
                ModifierKind::Tincture => tincture *= tincture_multiplier,
            }
        }
        debug_assert!(!(auto_crit && auto_cdh), "cannot be both auto-crit and auto-crit-direct");
        if no_cdh {
            auto_crit = false;
            auto_cdh = false;
        }

        let (crit_bonus, dh_bonus) = if no_cdh { (0.0, 0.0) } else { (crit_bonus, dh_bonus) };
        let unbuffed = calculate_damage(stats, 1.0, 0.0, 0.0);
        let buffed = calculate_damage(stats, tincture, crit_bonus, dh_bonus);
        let mut amount = compute_potency(self.base, &modifiers) * buffed / unbuffed;

        if auto_cdh {
            amount *= calculate_damage(stats, 1.0, 1.0 + crit_bonus, 1.0 + dh_bonus)
                / calculate_damage(stats, 1.0, crit_bonus, dh_bonus);
        } else if auto_crit {
            amount *= calculate_damage(stats, 1.0, 1.0 + crit_bonus, dh_bonus)
                / calculate_damage(stats, 1.0, crit_bonus, dh_bonus);
        }
        amount
    }
}
