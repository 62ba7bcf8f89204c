//! Read-only copies of engine state at one instant

use super::Engine;
use crate::error::EngineError;
use crate::potency::Potency;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub amount: f64,
    pub enabled: bool,
    /// Seconds until the pending change (expiry, lock release) fires
    pub time_till_ready: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownSnapshot {
    pub stacks: u32,
    pub max_stacks: u32,
    pub time_till_next_stack: f64,
}

/// Everything observable about an engine at one instant
///
/// Two engines built from the same record and config produce equal
/// snapshots at equal times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub time: f64,
    pub display_time: f64,
    pub resources: BTreeMap<String, ResourceSnapshot>,
    pub cooldowns: BTreeMap<String, CooldownSnapshot>,
    /// Resolved potencies in application order
    pub potencies: Vec<Potency>,
    /// Snapshotted potencies still in flight
    pub pending: Vec<Potency>,
}

impl Engine {
    pub fn snapshot(&self) -> Result<EngineSnapshot, EngineError> {
        let mut resources = BTreeMap::new();
        for rsc in self.resources.iter() {
            resources.insert(
                rsc.key.to_string(),
                ResourceSnapshot {
                    amount: rsc.available_amount(),
                    enabled: rsc.enabled(),
                    time_till_ready: self.time_till_ready(&rsc.key)?,
                },
            );
        }
        let cooldowns = self
            .cooldowns
            .iter()
            .map(|cd| {
                (
                    cd.key.to_string(),
                    CooldownSnapshot {
                        stacks: cd.stacks_available(),
                        max_stacks: cd.max_stacks(),
                        time_till_next_stack: cd.time_till_next_stack_available(),
                    },
                )
            })
            .collect();

        Ok(EngineSnapshot {
            time: self.time,
            display_time: self.display_time(),
            resources,
            cooldowns,
            potencies: self.potencies.entries().to_vec(),
            pending: self.derived.pending().cloned().collect(),
        })
    }
}
