//! Session - one engine plus the record it was built from
//!
//! Every mutation of a session goes through here so that the record and
//! the engine never disagree: rebuilding the engine from the record by an
//! exact replay always reproduces the current state.

use crate::config::{JobCatalog, SessionConfig};
use crate::engine::{Engine, EngineSnapshot, Interruption};
use crate::error::EngineError;
use crate::potency::DamageSummary;
use crate::record::{ActionNode, BuffMarker, Record, SerializedRecord};
use crate::report::SimReport;
use crate::skill::{SkillAvailability, SkillStatus};
use crate::types::EPSILON;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// How a line of actions is fed back through the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayMode {
    /// Reproduce every wait verbatim and use skills without waiting first
    Exact,
    /// Ignore recorded waits and use each skill as soon as it is usable
    Tight,
}

/// An action that could not be replayed
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("action {index} ({node}) failed: {reason}")]
pub struct ReplayFailure {
    /// Record index of the failing action
    pub index: usize,
    pub node: ActionNode,
    pub reason: String,
}

enum Flow {
    Continue,
    ReachedCutoff,
}

fn never(_: &Engine) -> bool {
    false
}

/// A live rotation-planning session
#[derive(Debug, Clone)]
pub struct Session {
    catalog: Arc<JobCatalog>,
    job: String,
    config: SessionConfig,
    buff_markers: Vec<BuffMarker>,
    engine: Engine,
    record: Record,
}

impl Session {
    pub fn new(catalog: Arc<JobCatalog>, job: &str, config: SessionConfig) -> Result<Self, EngineError> {
        Self::with_buff_markers(catalog, job, config, Vec::new())
    }

    pub fn with_buff_markers(
        catalog: Arc<JobCatalog>,
        job: &str,
        config: SessionConfig,
        buff_markers: Vec<BuffMarker>,
    ) -> Result<Self, EngineError> {
        let engine = Engine::new(Arc::clone(&catalog), job, config.clone(), buff_markers.clone())?;
        Ok(Session {
            catalog,
            job: job.to_string(),
            config,
            buff_markers,
            engine,
            record: Record::new(),
        })
    }

    /// Rebuild a saved session by replaying its actions exactly
    ///
    /// If an action fails, the session is cut just before it and the
    /// failure is returned with it; the actions before it are kept.
    pub fn load(
        catalog: Arc<JobCatalog>,
        job: &str,
        saved: SerializedRecord,
    ) -> Result<(Self, Option<ReplayFailure>), EngineError> {
        let mut session = Self::with_buff_markers(catalog, job, saved.config, saved.buff_markers)?;
        match session.replay(&saved.actions, ReplayMode::Exact, None) {
            Ok(()) => Ok((session, None)),
            Err(failure) => {
                info!(%failure, "record loaded up to the failing action");
                session.rewind_until_before(failure.index)?;
                Ok((session, Some(failure)))
            }
        }
    }

    pub fn serialize(&self) -> SerializedRecord {
        SerializedRecord {
            config: self.config.clone(),
            actions: self.record.actions().to_vec(),
            buff_markers: self.buff_markers.clone(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Mutable access for selection changes; the action log itself only
    /// changes through the session
    pub fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    pub fn catalog(&self) -> &Arc<JobCatalog> {
        &self.catalog
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn buff_markers(&self) -> &[BuffMarker] {
        &self.buff_markers
    }

    /// Availability of a skill by name, without using it
    pub fn skill_availability(&self, name: &str) -> Result<SkillAvailability, EngineError> {
        let key = self.catalog.skill_key(&self.job, name)?;
        self.engine.skill_availability(&key)
    }

    /// Use a skill now if it is ready
    ///
    /// The action is recorded only when the returned status is `Ready`.
    pub fn request_skill(&mut self, name: &str) -> Result<SkillAvailability, EngineError> {
        let key = self.catalog.skill_key(&self.job, name)?;
        let mut availability = self.engine.skill_availability(&key)?;
        if !availability.is_ready() {
            debug!(skill = %key, status = %availability.status, "skill not ready");
            return Ok(availability);
        }
        let node = self.record.len();
        availability.status = self.engine.use_skill(&key, node)?;
        if availability.is_ready() {
            self.record.append(ActionNode::skill(name));
        }
        Ok(availability)
    }

    /// Wait out locks and cooldowns, then use the skill
    pub fn use_skill_asap(&mut self, name: &str) -> Result<SkillAvailability, EngineError> {
        let availability = self.skill_availability(name)?;
        if let SkillStatus::Blocked { time_till_available } = availability.status {
            self.tick(time_till_available)?;
        }
        self.request_skill(name)
    }

    /// Advance time, recording the wait
    ///
    /// If a hardcast is interrupted the session rolls back to just before
    /// that cast and the interruption is returned as an error.
    pub fn tick(&mut self, delta: f64) -> Result<f64, EngineError> {
        self.tick_until(delta, &never)
    }

    /// Advance time until `stop` holds, recording the wait
    pub fn tick_until(&mut self, delta: f64, stop: &dyn Fn(&Engine) -> bool) -> Result<f64, EngineError> {
        let advanced = self.engine.tick(delta, stop)?;
        if advanced > 0.0 {
            self.record.append_wait(advanced);
        }
        if let Some(interruption) = self.engine.take_interruption() {
            self.roll_back(&interruption)?;
            return Err(EngineError::Interrupted(interruption));
        }
        Ok(advanced)
    }

    /// Wait until display time `target_time`
    ///
    /// A target already in the past is still recorded but advances nothing;
    /// it is reported as [`SimReport::PastTargetTime`].
    pub fn jump_to_timestamp(&mut self, target_time: f64) -> Result<f64, EngineError> {
        let node = self.record.len();
        let delta = target_time - self.engine.display_time();
        if delta < -EPSILON {
            self.report_past_target(node, target_time);
            self.record.append(ActionNode::JumpToTimestamp { target_time });
            return Ok(0.0);
        }
        self.advance_recorded(ActionNode::JumpToTimestamp { target_time }, delta)
    }

    /// Wait until the next mana tick has fired
    pub fn wait_for_mana(&mut self) -> Result<f64, EngineError> {
        let delta = self.engine.time_till_next_mana_tick().unwrap_or(0.0);
        self.advance_recorded(ActionNode::WaitForMana, delta)
    }

    fn advance_recorded(&mut self, node: ActionNode, delta: f64) -> Result<f64, EngineError> {
        let advanced = self.engine.tick(delta, &never)?;
        self.record.append(node);
        if let Some(interruption) = self.engine.take_interruption() {
            self.roll_back(&interruption)?;
            return Err(EngineError::Interrupted(interruption));
        }
        Ok(advanced)
    }

    fn report_past_target(&mut self, node: usize, target_time: f64) {
        info!(node, target_time, "jump target already passed");
        let time = self.engine.display_time();
        self.engine.push_report(SimReport::PastTargetTime {
            time,
            node,
            target_time,
        });
    }

    /// Switch a toggleable resource on or off
    pub fn toggle_resource(&mut self, name: &str) -> Result<bool, EngineError> {
        let key = self.catalog.resource_key(&self.job, name)?;
        let enabled = self.engine.toggle_resource(&key)?;
        self.record.append(ActionNode::ToggleResource {
            resource: name.to_string(),
        });
        Ok(enabled)
    }

    fn roll_back(&mut self, interruption: &Interruption) -> Result<(), EngineError> {
        info!(%interruption, "rolling back to before the interrupted action");
        self.rewind_until_before(interruption.node)
    }

    /// Drop action `index` and everything after it, rebuilding the engine
    pub fn rewind_until_before(&mut self, index: usize) -> Result<(), EngineError> {
        let keep = index.min(self.record.len());
        let prefix = self.record.actions()[..keep].to_vec();
        let selection = self.record.selection();

        let mut fresh = Self::with_buff_markers(
            Arc::clone(&self.catalog),
            &self.job,
            self.config.clone(),
            self.buff_markers.clone(),
        )?;
        fresh
            .replay(&prefix, ReplayMode::Exact, None)
            .map_err(EngineError::ReplayFailed)?;

        self.engine = fresh.engine;
        self.record = fresh.record;
        if let Some(sel) = selection {
            self.record.select_range(sel.start, sel.end);
        }
        Ok(())
    }

    /// Remove the last action
    pub fn undo_last(&mut self) -> Result<Option<ActionNode>, EngineError> {
        let Some(last) = self.record.last().cloned() else {
            return Ok(None);
        };
        self.rewind_until_before(self.record.len() - 1)?;
        Ok(Some(last))
    }

    /// Remove waits at the end of the record
    pub fn remove_trailing_idle_time(&mut self) -> Result<(), EngineError> {
        let mut keep = self.record.len();
        while keep > 0 && matches!(self.record.get(keep - 1), Some(ActionNode::Wait { .. })) {
            keep -= 1;
        }
        if keep < self.record.len() {
            self.rewind_until_before(keep)?;
        }
        Ok(())
    }

    /// Append a line of actions, each as early as possible
    ///
    /// On failure the session is restored to its state before the line
    /// and the failing action is returned. On success the added actions
    /// become the selection.
    pub fn try_add_line(&mut self, line: &[ActionNode]) -> Result<(), ReplayFailure> {
        let first_added = self.record.len();
        match self.replay(line, ReplayMode::Tight, None) {
            Ok(()) => {
                self.record.select_range(first_added, self.record.len());
                Ok(())
            }
            Err(failure) => {
                info!(%failure, "line rejected, rolling back");
                self.rewind_until_before(first_added).map_err(|e| ReplayFailure {
                    index: first_added,
                    node: failure.node.clone(),
                    reason: e.to_string(),
                })?;
                Err(failure)
            }
        }
    }

    /// Feed `line` through the engine, appending each action to the record
    ///
    /// With `max_replay_time` (raw simulation time) the replay stops at the
    /// first action that would start after it, then waits up to it.
    pub fn replay(
        &mut self,
        line: &[ActionNode],
        mode: ReplayMode,
        max_replay_time: Option<f64>,
    ) -> Result<(), ReplayFailure> {
        for node in line {
            if let Some(cut) = max_replay_time {
                if self.engine.time() > cut + EPSILON {
                    break;
                }
            }
            let index = self.record.len();
            match self.replay_node(index, node, mode, max_replay_time)? {
                Flow::Continue => {}
                Flow::ReachedCutoff => break,
            }
        }

        if let Some(cut) = max_replay_time {
            let rest = cut - self.engine.time();
            if rest > EPSILON {
                let index = self.record.len();
                self.replay_wait(index, &ActionNode::wait(rest), rest)?;
            }
        }
        Ok(())
    }

    fn replay_node(
        &mut self,
        index: usize,
        node: &ActionNode,
        mode: ReplayMode,
        cut: Option<f64>,
    ) -> Result<Flow, ReplayFailure> {
        let fail = |reason: String| ReplayFailure {
            index,
            node: node.clone(),
            reason,
        };
        let until_cut = |engine: &Engine, delta: f64| match cut {
            Some(cut) => delta.min((cut - engine.time()).max(0.0)),
            None => delta,
        };

        match node {
            ActionNode::Skill { skill } => {
                let key = self
                    .catalog
                    .skill_key(&self.job, skill)
                    .map_err(|e| fail(e.to_string()))?;
                if mode == ReplayMode::Tight {
                    let availability = self
                        .engine
                        .skill_availability(&key)
                        .map_err(|e| fail(e.to_string()))?;
                    if let SkillStatus::Blocked { time_till_available } = availability.status {
                        let wait = until_cut(&self.engine, time_till_available);
                        if wait > 0.0 {
                            self.replay_wait(index, &ActionNode::wait(wait), wait)?;
                        }
                        if wait + EPSILON < time_till_available {
                            return Ok(Flow::ReachedCutoff);
                        }
                    }
                }
                let index = self.record.len();
                let status = self
                    .engine
                    .use_skill(&key, index)
                    .map_err(|e| fail(e.to_string()))?;
                if !status.is_ready() {
                    info!(skill = %key, %status, "replay stopped");
                    return Err(ReplayFailure {
                        index,
                        node: node.clone(),
                        reason: status.to_string(),
                    });
                }
                self.record.append(node.clone());
            }
            ActionNode::Wait { duration } => {
                if mode == ReplayMode::Exact {
                    let wait = until_cut(&self.engine, *duration);
                    if wait + EPSILON < *duration {
                        self.replay_wait(index, &ActionNode::wait(wait), wait)?;
                        return Ok(Flow::ReachedCutoff);
                    }
                    self.replay_wait(index, node, *duration)?;
                }
            }
            ActionNode::ToggleResource { resource } => {
                let key = self
                    .catalog
                    .resource_key(&self.job, resource)
                    .map_err(|e| fail(e.to_string()))?;
                self.engine.toggle_resource(&key).map_err(|e| fail(e.to_string()))?;
                self.record.append(node.clone());
            }
            ActionNode::JumpToTimestamp { target_time } => {
                let delta = target_time - self.engine.display_time();
                if delta < -EPSILON {
                    self.report_past_target(index, *target_time);
                    self.record.append(node.clone());
                    return Ok(Flow::Continue);
                }
                let delta = delta.max(0.0);
                let wait = until_cut(&self.engine, delta);
                self.replay_wait(index, node, wait)?;
                if wait + EPSILON < delta {
                    return Ok(Flow::ReachedCutoff);
                }
            }
            ActionNode::WaitForMana => {
                let delta = self.engine.time_till_next_mana_tick().unwrap_or(0.0);
                let wait = until_cut(&self.engine, delta);
                self.replay_wait(index, node, wait)?;
                if wait + EPSILON < delta {
                    return Ok(Flow::ReachedCutoff);
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Tick the engine and append `node`, surfacing any interruption
    fn replay_wait(&mut self, index: usize, node: &ActionNode, delta: f64) -> Result<(), ReplayFailure> {
        self.engine.tick(delta, &never).map_err(|e| ReplayFailure {
            index,
            node: node.clone(),
            reason: e.to_string(),
        })?;
        self.record.append(node.clone());
        if let Some(interruption) = self.engine.take_interruption() {
            let failed = self
                .record
                .get(interruption.node)
                .cloned()
                .unwrap_or_else(|| node.clone());
            return Err(ReplayFailure {
                index: interruption.node,
                node: failed,
                reason: interruption.to_string(),
            });
        }
        Ok(())
    }

    /// State as of display time `cutoff`, computed on a throwaway copy
    pub fn historical_state(&self, cutoff: f64) -> Result<EngineSnapshot, EngineError> {
        let mut scratch = Self::with_buff_markers(
            Arc::clone(&self.catalog),
            &self.job,
            self.config.clone(),
            self.buff_markers.clone(),
        )?;
        let raw_cutoff = cutoff + self.config.countdown;
        scratch
            .replay(self.record.actions(), ReplayMode::Exact, Some(raw_cutoff))
            .map_err(EngineError::ReplayFailed)?;
        scratch.engine.snapshot()
    }

    /// Place an externally reported party buff on the timeline
    pub fn add_buff_marker(&mut self, marker: BuffMarker) {
        self.buff_markers.push(marker);
        self.engine.set_party_buffs(self.buff_markers.clone());
    }

    pub fn drain_reports(&mut self) -> Vec<SimReport> {
        self.engine.drain_reports()
    }

    pub fn damage_summary(&self) -> DamageSummary {
        self.engine.damage_summary()
    }
}
