//! What an event does when it fires

use crate::types::{ResourceKey, SkillKey};
use serde::{Deserialize, Serialize};

/// Effect descriptor attached to a scheduled event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEffect {
    /// Add to a resource (lock release, stack regain)
    GainResource { resource: ResourceKey, amount: f64 },
    /// Remove every stack of a resource (status expiry, combo timeout)
    DropResource { resource: ResourceKey },
    /// End of the hardcast window: re-validate and snapshot the potency
    SpellConfirm { node: usize, skill: SkillKey },
    /// Damage of an action lands
    Application { node: usize, skill: SkillKey },
    /// Recurring mana regeneration
    ManaTick,
    /// Recurring server tick for every active damage-over-time effect
    DotTick,
}

impl EventEffect {
    /// Resource whose pending change this effect represents, if any
    pub fn resource(&self) -> Option<&ResourceKey> {
        match self {
            EventEffect::GainResource { resource, .. } | EventEffect::DropResource { resource } => {
                Some(resource)
            }
            _ => None,
        }
    }
}
