//! Action record - the append-only log a session is rebuilt from

mod action;
mod marker;

pub use action::{ActionKind, ActionNode, SerializedAction};
pub use marker::{active_party_buffs, BuffMarker};

use crate::config::{ConfigError, SessionConfig};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;

/// Contiguous selected range of record indices, `start..end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Ordered action log with an optional selection
///
/// The log only grows by appending; rewinding rebuilds a shorter log by replay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    actions: Vec<ActionNode>,
    selection: Option<Selection>,
}

impl Record {
    pub fn new() -> Self {
        Record {
            actions: Vec::new(),
            selection: None,
        }
    }

    pub fn append(&mut self, node: ActionNode) {
        self.actions.push(node);
    }

    /// Append a wait, folding it into a trailing wait if there is one
    pub fn append_wait(&mut self, duration: f64) {
        if let Some(ActionNode::Wait { duration: last }) = self.actions.last_mut() {
            *last += duration;
        } else {
            self.actions.push(ActionNode::Wait { duration });
        }
    }

    pub fn first(&self) -> Option<&ActionNode> {
        self.actions.first()
    }

    pub fn last(&self) -> Option<&ActionNode> {
        self.actions.last()
    }

    pub fn get(&self, index: usize) -> Option<&ActionNode> {
        self.actions.get(index)
    }

    pub fn actions(&self) -> &[ActionNode] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn select_single(&mut self, index: usize) {
        if index < self.actions.len() {
            self.selection = Some(Selection {
                start: index,
                end: index + 1,
            });
        }
    }

    /// Select `start..end`, clamped to the log
    pub fn select_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.actions.len());
        self.selection = if start < end {
            Some(Selection { start, end })
        } else {
            None
        };
    }

    /// Grow the selection so it reaches `index` (inclusive)
    pub fn select_until(&mut self, index: usize) {
        match self.selection {
            None => self.select_single(index),
            Some(sel) if index < sel.start => self.select_range(index, sel.end),
            Some(sel) => self.select_range(sel.start, index + 1),
        }
    }

    pub fn unselect(&mut self) {
        self.selection = None;
    }

    /// Copy of the selected actions, e.g. to save as a preset
    pub fn selected_line(&self) -> Vec<ActionNode> {
        self.selection
            .map(|sel| self.actions[sel.range()].to_vec())
            .unwrap_or_default()
    }
}

/// Persisted form of a session: its configuration plus its action log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedRecord {
    pub config: SessionConfig,
    pub actions: Vec<ActionNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buff_markers: Vec<BuffMarker>,
}

impl SerializedRecord {
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a saved record
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let record: SerializedRecord = serde_json::from_str(content)?;
        record.config.validate()?;
        Ok(record)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let record: SerializedRecord = crate::config::load_json(path)?;
        record.config.validate()?;
        Ok(record)
    }
}
