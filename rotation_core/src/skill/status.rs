//! SkillStatus - the resolver's answer to "can I use this now?"

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of evaluating a skill request
///
/// Checks run in order: unlock level, requirements, mana, then locks and
/// cooldowns. The first failing check decides the status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SkillStatus {
    Ready,
    /// Locked out by animation lock, caster tax or cooldown
    Blocked { time_till_available: f64 },
    InsufficientResource {
        resource: String,
        needed: f64,
        available: f64,
    },
    RequirementsNotMet { reason: String },
    NotInCombat,
    NotUnlocked { required_level: u32 },
}

impl SkillStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, SkillStatus::Ready)
    }
}

impl fmt::Display for SkillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillStatus::Ready => write!(f, "ready"),
            SkillStatus::Blocked { time_till_available } => {
                write!(f, "blocked for another {:.3}s", time_till_available)
            }
            SkillStatus::InsufficientResource {
                resource,
                needed,
                available,
            } => write!(f, "needs {} {} but only {} available", needed, resource, available),
            SkillStatus::RequirementsNotMet { reason } => write!(f, "{}", reason),
            SkillStatus::NotInCombat => write!(f, "can only be used in combat"),
            SkillStatus::NotUnlocked { required_level } => {
                write!(f, "unlocks at level {}", required_level)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_reasons() {
        let status = SkillStatus::InsufficientResource {
            resource: "common/mana".to_string(),
            needed: 800.0,
            available: 200.0,
        };
        assert_eq!(status.to_string(), "needs 800 common/mana but only 200 available");
        assert_eq!(
            SkillStatus::Blocked { time_till_available: 1.5 }.to_string(),
            "blocked for another 1.500s"
        );
        assert!(!status.is_ready());
        assert!(SkillStatus::Ready.is_ready());
    }
}
