//! CoolDown - recast timer with independently recharging charges

use crate::types::{ResourceKey, EPSILON};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A recast timer with 1..N charges
///
/// Only one charge recharges at a time. Using a charge while all charges
/// are full starts the timer; otherwise the running timer is left alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoolDown {
    pub key: ResourceKey,
    max_stacks: u32,
    stacks: u32,
    default_recast: f64,
    /// Recast of the charge currently recharging (differs for special recasts)
    current_recast: f64,
    /// Haste multiplier on recharge durations
    recast_time_scale: f64,
    time_till_next_stack: f64,
}

impl CoolDown {
    /// Create a cooldown with every charge available
    pub fn new(key: ResourceKey, recast: f64, max_stacks: u32) -> Self {
        CoolDown {
            key,
            max_stacks,
            stacks: max_stacks,
            default_recast: recast,
            current_recast: recast,
            recast_time_scale: 1.0,
            time_till_next_stack: 0.0,
        }
    }

    pub fn max_stacks(&self) -> u32 {
        self.max_stacks
    }

    pub fn stacks_available(&self) -> u32 {
        self.stacks
    }

    pub fn available(&self, stacks: u32) -> bool {
        self.stacks >= stacks
    }

    /// Recast the next charge will take, scale included
    pub fn current_stack_cd(&self) -> f64 {
        self.current_recast * self.recast_time_scale
    }

    pub fn default_recast(&self) -> f64 {
        self.default_recast
    }

    /// Change the haste multiplier
    ///
    /// A charge already recharging has its remaining time rescaled by
    /// `scale / old_scale`; later recharges start at the new scale.
    pub fn set_recast_time_scale(&mut self, scale: f64) {
        if self.stacks < self.max_stacks && self.recast_time_scale > 0.0 {
            self.time_till_next_stack *= scale / self.recast_time_scale;
        }
        self.recast_time_scale = scale;
    }

    pub fn recast_time_scale(&self) -> f64 {
        self.recast_time_scale
    }

    /// Spend one charge
    pub fn use_stack(&mut self) {
        if self.stacks == 0 {
            warn!(cooldown = %self.key, "used a cooldown with no charges left");
            return;
        }
        if self.stacks == self.max_stacks {
            self.time_till_next_stack = self.current_stack_cd();
        }
        self.stacks -= 1;
    }

    /// Spend the only charge with a one-off recast (e.g. a longer GCD)
    pub fn use_stack_with_recast(&mut self, recast: f64) {
        debug_assert!(
            self.max_stacks == 1,
            "special recasts are only supported on single-charge cooldowns"
        );
        self.current_recast = recast;
        self.use_stack();
    }

    /// Recharge by `delta_time` seconds, possibly regaining several charges
    pub fn restore(&mut self, mut delta_time: f64) {
        while delta_time > 0.0 && self.stacks < self.max_stacks {
            let for_this_stack = self.time_till_next_stack.min(delta_time);
            self.time_till_next_stack -= for_this_stack;
            if self.time_till_next_stack < EPSILON {
                self.stacks += 1;
                self.current_recast = self.default_recast;
                if self.stacks < self.max_stacks {
                    self.time_till_next_stack += self.current_stack_cd();
                } else {
                    self.time_till_next_stack = 0.0;
                }
            }
            delta_time -= for_this_stack;
        }
    }

    /// Time until the recharging charge comes back (0 when full)
    pub fn time_till_next_stack_available(&self) -> f64 {
        if self.stacks == self.max_stacks {
            0.0
        } else {
            self.time_till_next_stack
        }
    }

    /// Time until at least one charge can be spent
    pub fn time_till_any_stack_available(&self) -> f64 {
        if self.stacks > 0 {
            0.0
        } else {
            self.time_till_next_stack
        }
    }
}
