//! BuffMarker - a party buff reported from outside the simulation

use crate::potency::{ModifierKind, PotencyModifier};
use serde::{Deserialize, Serialize};

/// A buff from another party member, placed on the timeline by hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuffMarker {
    pub name: String,
    /// Display time the buff goes up
    pub start_time: f64,
    pub duration: f64,
    pub modifier: ModifierKind,
}

impl BuffMarker {
    /// Whether the buff covers display time `time`
    pub fn covers(&self, time: f64) -> bool {
        time >= self.start_time && time < self.start_time + self.duration
    }

    pub fn potency_modifier(&self) -> PotencyModifier {
        PotencyModifier::new(self.name.clone(), self.modifier.clone())
    }
}

/// Modifiers of every marker covering `time`
pub fn active_party_buffs(markers: &[BuffMarker], time: f64) -> Vec<PotencyModifier> {
    markers
        .iter()
        .filter(|m| m.covers(time))
        .map(BuffMarker::potency_modifier)
        .collect()
}
