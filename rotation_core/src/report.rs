//! Reported events - notifications for observers of a running simulation
//!
//! The engine appends reports as the corresponding events fire; callers
//! drain them whenever convenient. Times are display times (0 = pull).

use crate::types::{ResourceKey, SkillKey};
use serde::{Deserialize, Serialize};

/// Something an observer may want to show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimReport {
    DamageApplied {
        time: f64,
        skill: SkillKey,
        node: Option<usize>,
        potency: f64,
    },
    ResourceTick {
        time: f64,
        resource: ResourceKey,
        amount: f64,
    },
    DotTick {
        time: f64,
        resource: ResourceKey,
        skill: SkillKey,
        potency: f64,
    },
    DotApplied {
        time: f64,
        resource: ResourceKey,
        /// Seconds the target went without this effect, if it lapsed before
        gap: Option<f64>,
    },
    DotDropped {
        time: f64,
        resource: ResourceKey,
    },
    Interrupted {
        time: f64,
        node: usize,
        skill: SkillKey,
        reason: String,
    },
    /// A jump targeted a time that had already passed; no time advanced
    PastTargetTime {
        time: f64,
        node: usize,
        target_time: f64,
    },
}

impl SimReport {
    pub fn time(&self) -> f64 {
        match self {
            SimReport::DamageApplied { time, .. }
            | SimReport::ResourceTick { time, .. }
            | SimReport::DotTick { time, .. }
            | SimReport::DotApplied { time, .. }
            | SimReport::DotDropped { time, .. }
            | SimReport::Interrupted { time, .. }
            | SimReport::PastTargetTime { time, .. } => *time,
        }
    }
}
