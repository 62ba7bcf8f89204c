//! Prelude module for convenient imports
//!
//! ```rust
//! use rotation_core::prelude::*;
//! ```

// Session and driving
pub use crate::driver::RealTimeDriver;
pub use crate::session::{ReplayFailure, ReplayMode, Session};

// Engine
pub use crate::engine::{Engine, EngineSnapshot, Interruption};
pub use crate::report::SimReport;
pub use crate::skill::{SkillAvailability, SkillStatus};

// Record
pub use crate::record::{ActionNode, BuffMarker, SerializedRecord};

// Config
pub use crate::config::{JobCatalog, ProcMode, SessionConfig, SlidecastMode};

// Errors
pub use crate::config::ConfigError;
pub use crate::error::EngineError;
