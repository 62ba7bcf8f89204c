//! ActionNode - one entry of the action log

use serde::{Deserialize, Serialize};
use std::fmt;

/// A user action, as recorded
///
/// Nodes are immutable once appended. Everything derived from them
/// (lock timings, potencies) is recomputed by replaying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SerializedAction", into = "SerializedAction")]
pub enum ActionNode {
    /// Use a skill by name
    Skill { skill: String },
    /// Let time pass
    Wait { duration: f64 },
    /// Switch a toggleable resource on or off
    ToggleResource { resource: String },
    /// Wait until an absolute display time
    JumpToTimestamp { target_time: f64 },
    /// Wait until the next mana tick
    WaitForMana,
}

impl ActionNode {
    pub fn skill(name: impl Into<String>) -> Self {
        ActionNode::Skill { skill: name.into() }
    }

    pub fn wait(duration: f64) -> Self {
        ActionNode::Wait { duration }
    }

    pub fn is_skill(&self) -> bool {
        matches!(self, ActionNode::Skill { .. })
    }
}

impl fmt::Display for ActionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionNode::Skill { skill } => write!(f, "use {}", skill),
            ActionNode::Wait { duration } => write!(f, "wait {:.3}s", duration),
            ActionNode::ToggleResource { resource } => write!(f, "toggle {}", resource),
            ActionNode::JumpToTimestamp { target_time } => write!(f, "jump to {:.3}s", target_time),
            ActionNode::WaitForMana => write!(f, "wait for mp"),
        }
    }
}

/// Kind tag of a serialized action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Skill,
    Wait,
    SetResourceEnabled,
    JumpToTimestamp,
    WaitForMP,
}

/// Flat wire shape of an action: `{kind, skillName?, waitDuration, buffName?, targetTime?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedAction {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_name: Option<String>,
    #[serde(default)]
    pub wait_duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buff_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_time: Option<f64>,
}

impl From<ActionNode> for SerializedAction {
    fn from(node: ActionNode) -> Self {
        let mut out = SerializedAction {
            kind: ActionKind::Wait,
            skill_name: None,
            wait_duration: 0.0,
            buff_name: None,
            target_time: None,
        };
        match node {
            ActionNode::Skill { skill } => {
                out.kind = ActionKind::Skill;
                out.skill_name = Some(skill);
            }
            ActionNode::Wait { duration } => out.wait_duration = duration,
            ActionNode::ToggleResource { resource } => {
                out.kind = ActionKind::SetResourceEnabled;
                out.buff_name = Some(resource);
            }
            ActionNode::JumpToTimestamp { target_time } => {
                out.kind = ActionKind::JumpToTimestamp;
                out.target_time = Some(target_time);
            }
            ActionNode::WaitForMana => out.kind = ActionKind::WaitForMP,
        }
        out
    }
}

impl TryFrom<SerializedAction> for ActionNode {
    type Error = String;

    fn try_from(action: SerializedAction) -> Result<Self, Self::Error> {
        match action.kind {
            ActionKind::Skill => action
                .skill_name
                .map(|skill| ActionNode::Skill { skill })
                .ok_or_else(|| "skill action without skillName".to_string()),
            ActionKind::Wait => {
                if action.wait_duration.is_finite() && action.wait_duration >= 0.0 {
                    Ok(ActionNode::Wait {
                        duration: action.wait_duration,
                    })
                } else {
                    Err(format!("invalid waitDuration {}", action.wait_duration))
                }
            }
            ActionKind::SetResourceEnabled => action
                .buff_name
                .map(|resource| ActionNode::ToggleResource { resource })
                .ok_or_else(|| "toggle action without buffName".to_string()),
            ActionKind::JumpToTimestamp => action
                .target_time
                .map(|target_time| ActionNode::JumpToTimestamp { target_time })
                .ok_or_else(|| "jump action without targetTime".to_string()),
            ActionKind::WaitForMP => Ok(ActionNode::WaitForMana),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(ActionNode::skill("bolt")).unwrap();
        assert_eq!(json["kind"], "Skill");
        assert_eq!(json["skillName"], "bolt");
        assert_eq!(json["waitDuration"], 0.0);
        assert!(json.get("buffName").is_none());

        let json = serde_json::to_value(ActionNode::ToggleResource {
            resource: "ley_lines".to_string(),
        })
        .unwrap();
        assert_eq!(json["kind"], "SetResourceEnabled");
        assert_eq!(json["buffName"], "ley_lines");
    }

    #[test]
    fn test_wait_for_mana_wire_kind() {
        let json = serde_json::to_value(ActionNode::WaitForMana).unwrap();
        assert_eq!(json["kind"], "WaitForMP");
        let back: ActionNode = serde_json::from_str(r#"{"kind":"WaitForMP","waitDuration":0}"#).unwrap();
        assert_eq!(back, ActionNode::WaitForMana);
    }

    #[test]
    fn test_rejects_incomplete_actions() {
        assert!(serde_json::from_str::<ActionNode>(r#"{"kind":"Skill","waitDuration":0}"#).is_err());
        assert!(serde_json::from_str::<ActionNode>(r#"{"kind":"Wait","waitDuration":-1}"#).is_err());
    }

    #[test]
    fn test_wait_duration_is_lossless() {
        let node = ActionNode::wait(0.1 + 0.2);
        let json = serde_json::to_string(&node).unwrap();
        let back: ActionNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
