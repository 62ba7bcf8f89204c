//! Potency & modifier engine
//!
//! This module provides:
//! - Potency: a damage value snapshotted with its modifiers
//! - PotencyModifier: buffs tagged with their source
//! - math: crit/direct-hit expected value and speed formulas
//! - PotencyTable / DamageSummary: resolved output of a session

pub mod math;
mod modifier;
mod table;
mod value;

pub use math::CombatStats;
pub use modifier::{compute_potency, ModifierKind, PotencyModifier};
pub use table::{DamageSummary, PotencyTable, SkillDamage};
pub use value::Potency;
