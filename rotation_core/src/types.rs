//! Core types shared across the simulation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance used for every time and resource comparison in the engine
pub const EPSILON: f64 = 1e-6;

/// Owner of a resource or cooldown name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Built-in resources every job has (mana, locks, combat flag, GCD)
    Common,
    /// Resources declared by one job definition
    Job(String),
}

/// Namespaced identifier for a resource or cooldown
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub namespace: Namespace,
    pub name: String,
}

impl ResourceKey {
    /// Key for a built-in resource
    pub fn common(name: &str) -> Self {
        ResourceKey {
            namespace: Namespace::Common,
            name: name.to_string(),
        }
    }

    /// Key for a job-local resource
    pub fn job(job: &str, name: &str) -> Self {
        ResourceKey {
            namespace: Namespace::Job(job.to_string()),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Namespace::Common => write!(f, "common/{}", self.name),
            Namespace::Job(job) => write!(f, "{}/{}", job, self.name),
        }
    }
}

/// Namespaced identifier for a skill
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SkillKey {
    pub job: String,
    pub name: String,
}

impl SkillKey {
    pub fn new(job: &str, name: &str) -> Self {
        SkillKey {
            job: job.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for SkillKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.job, self.name)
    }
}

/// Level sync brackets with their own stat tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum LevelSync {
    Lvl70,
    Lvl80,
    Lvl90,
    Lvl100,
}

impl LevelSync {
    /// The numeric character level
    pub fn level(self) -> u32 {
        match self {
            LevelSync::Lvl70 => 70,
            LevelSync::Lvl80 => 80,
            LevelSync::Lvl90 => 90,
            LevelSync::Lvl100 => 100,
        }
    }

    /// Main stat value at which determination gives no bonus
    pub fn main_stat_base(self) -> f64 {
        match self {
            LevelSync::Lvl70 => 292.0,
            LevelSync::Lvl80 => 340.0,
            LevelSync::Lvl90 => 390.0,
            LevelSync::Lvl100 => 440.0,
        }
    }

    /// Sub stat value at which crit, direct hit and speed give no bonus
    pub fn sub_stat_base(self) -> f64 {
        match self {
            LevelSync::Lvl70 => 364.0,
            LevelSync::Lvl80 => 380.0,
            LevelSync::Lvl90 => 400.0,
            LevelSync::Lvl100 => 420.0,
        }
    }

    /// Level divisor used by every stat formula
    pub fn stat_divisor(self) -> f64 {
        match self {
            LevelSync::Lvl70 => 900.0,
            LevelSync::Lvl80 => 1300.0,
            LevelSync::Lvl90 => 1900.0,
            LevelSync::Lvl100 => 2780.0,
        }
    }
}

impl Default for LevelSync {
    fn default() -> Self {
        LevelSync::Lvl100
    }
}

impl TryFrom<u32> for LevelSync {
    type Error = String;

    fn try_from(level: u32) -> Result<Self, Self::Error> {
        match level {
            70 => Ok(LevelSync::Lvl70),
            80 => Ok(LevelSync::Lvl80),
            90 => Ok(LevelSync::Lvl90),
            100 => Ok(LevelSync::Lvl100),
            other => Err(format!("unsupported level sync {}", other)),
        }
    }
}

impl From<LevelSync> for u32 {
    fn from(level: LevelSync) -> u32 {
        level.level()
    }
}

impl fmt::Display for LevelSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}
