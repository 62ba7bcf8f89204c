//! rotation_core - Discrete-event simulation core for rotation planning
//!
//! This library provides:
//! - Resource / CoolDown: bounded gauges, statuses, locks and charge timers
//! - EventQueue: the simulated clock and its ordered pending effects
//! - Potency: snapshotted damage values and the modifier math behind them
//! - Engine: skill resolution, effect interpretation and reported events
//! - Session: the action record, exact and tight replay, historical queries

pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod event;
pub mod potency;
pub mod prelude;
pub mod record;
pub mod report;
pub mod resource;
pub mod session;
pub mod skill;
pub mod types;

// Re-export core types for convenience
pub use config::{ConfigError, JobCatalog, ProcMode, SessionConfig, SlidecastMode};
pub use driver::RealTimeDriver;
pub use engine::{Engine, EngineSnapshot, Interruption};
pub use error::EngineError;
pub use potency::{DamageSummary, ModifierKind, Potency, PotencyModifier};
pub use record::{ActionNode, BuffMarker, Record, SerializedRecord};
pub use report::SimReport;
pub use resource::{CoolDown, Resource};
pub use session::{ReplayFailure, ReplayMode, Session};
pub use skill::{SkillAvailability, SkillStatus};
pub use types::{LevelSync, ResourceKey, SkillKey};
