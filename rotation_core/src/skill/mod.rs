//! Skill resolution outcomes
//!
//! The resolver itself lives on the engine (it needs the live resource
//! state); this module holds what it reports back.

mod status;

pub use status::SkillStatus;

use crate::types::SkillKey;
use serde::{Deserialize, Serialize};

/// Everything a caller needs to know about using a skill right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillAvailability {
    pub skill: SkillKey,
    pub status: SkillStatus,
    /// Seconds until the skill could be used, ignoring resources
    pub time_till_available: f64,
    /// Cast time after speed and haste; 0 when instant
    pub cast_time: f64,
    pub instant: bool,
    pub stacks_available: u32,
    pub max_stacks: u32,
    /// Recast the cooldown would take if used now
    pub recast: f64,
    pub mana_cost: f64,
    /// Seconds from now until the damage would land
    pub time_till_damage_application: f64,
}

impl SkillAvailability {
    pub fn is_ready(&self) -> bool {
        self.status.is_ready()
    }
}
