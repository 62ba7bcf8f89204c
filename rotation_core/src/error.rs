//! Engine error types

use crate::engine::Interruption;
use crate::session::ReplayFailure;
use thiserror::Error;

/// Failures surfaced by the simulation core
///
/// Skill availability outcomes are not errors; see
/// [`SkillStatus`](crate::skill::SkillStatus).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Unknown job: {0}")]
    UnknownJob(String),
    #[error("Unknown skill: {0}")]
    UnknownSkill(String),
    #[error("Unknown resource: {0}")]
    UnknownResource(String),
    #[error("Resource {0} cannot be toggled")]
    NotToggleable(String),
    #[error("{0}")]
    Interrupted(Interruption),
    #[error("{0}")]
    ReplayFailed(ReplayFailure),
}
