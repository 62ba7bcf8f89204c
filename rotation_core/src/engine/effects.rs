//! Requirements, snapshot modifiers and skill effects

use super::{DotTracker, Engine, COMBO_TIMEOUT};
use crate::config::{Effect, ProcMode, Requirement};
use crate::error::EngineError;
use crate::event::EventEffect;
use crate::potency::{Potency, PotencyModifier};
use crate::report::SimReport;
use crate::types::{ResourceKey, SkillKey, EPSILON};
use rand::Rng;
use tracing::{debug, warn};

impl Engine {
    /// Reason a requirement fails right now, if it does
    pub(crate) fn requirement_failure(
        &self,
        req: &Requirement<ResourceKey>,
    ) -> Result<Option<String>, EngineError> {
        Ok(match req {
            Requirement::HasResource { resource, at_least } => {
                let rsc = self.resources.get(resource)?;
                (!rsc.available(*at_least)).then(|| {
                    format!(
                        "requires {} {} but only {} available",
                        at_least,
                        resource,
                        rsc.available_amount()
                    )
                })
            }
            Requirement::LacksResource { resource } => {
                let rsc = self.resources.get(resource)?;
                (rsc.available_amount() > EPSILON).then(|| format!("cannot be used while {} is active", resource))
            }
            Requirement::ResourceAtMost { resource, at_most } => {
                let rsc = self.resources.get(resource)?;
                (rsc.available_amount() > at_most + EPSILON)
                    .then(|| format!("requires at most {} {}", at_most, resource))
            }
            Requirement::InCombat => (!self.in_combat()?).then(|| "can only be used in combat".to_string()),
        })
    }

    /// First failing requirement of a list
    pub(crate) fn unmet_requirement(
        &self,
        requirements: &[Requirement<ResourceKey>],
    ) -> Result<Option<String>, EngineError> {
        for req in requirements {
            if let Some(reason) = self.requirement_failure(req)? {
                return Ok(Some(reason));
            }
        }
        Ok(None)
    }

    /// Modifiers granted by every active status of the job
    pub(crate) fn status_modifiers(&self) -> Result<Vec<PotencyModifier>, EngineError> {
        let mut modifiers = Vec::new();
        for (key, def) in self.catalog.resources(&self.job)? {
            if let Some(kind) = &def.potency_modifier {
                if self.resources.get(key)?.available(1.0) {
                    modifiers.push(PotencyModifier::new(def.name.clone(), kind.clone()));
                }
            }
        }
        Ok(modifiers)
    }

    fn status_timeout(&self, key: &ResourceKey) -> Option<f64> {
        self.catalog.resource_definition(key).and_then(|d| d.timeout)
    }

    pub(crate) fn run_effects(
        &mut self,
        node: usize,
        skill: &SkillKey,
        effects: &[Effect<ResourceKey>],
    ) -> Result<(), EngineError> {
        for effect in effects {
            match effect {
                Effect::GainStatus { resource, stacks } => self.gain_status(resource, *stacks)?,
                Effect::Gain { resource, amount } => self.resources.get_mut(resource)?.gain(*amount),
                Effect::Consume { resource, amount } => self.consume_resource(resource, *amount)?,
                Effect::ConsumeAll { resource } => {
                    let now = self.time;
                    self.resources.get_mut(resource)?.consume_all(now);
                    self.resources.remove_timer(&mut self.events, resource)?;
                }
                Effect::SetCombo { resource, value } => self.set_combo(resource, *value)?,
                Effect::ApplyDot {
                    resource,
                    tick_potency,
                } => self.apply_dot(node, skill, resource, *tick_potency)?,
                Effect::MaybeGainProc { resource, chance } => {
                    let procs = match self.config.proc_mode {
                        ProcMode::Never => false,
                        ProcMode::Always => true,
                        ProcMode::Rng => self.rng.gen::<f64>() < *chance,
                    };
                    if procs {
                        debug!(resource = %resource, "proc");
                        self.gain_status(resource, 1.0)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Grant or refresh a timed status
    pub(crate) fn gain_status(&mut self, key: &ResourceKey, stacks: f64) -> Result<(), EngineError> {
        let timeout = self.status_timeout(key);
        let now = self.time;
        let rsc = self.resources.get_mut(key)?;
        rsc.set_enabled(true);
        if rsc.pending_change().is_some() {
            rsc.override_current_value(stacks, now);
            if let Some(timeout) = timeout {
                self.resources.override_timer(&mut self.events, key, timeout)?;
            }
        } else {
            rsc.gain(stacks);
            if let Some(timeout) = timeout {
                self.resources.add_resource_event(
                    &mut self.events,
                    key,
                    format!("drop {}", key),
                    timeout,
                    EventEffect::DropResource { resource: key.clone() },
                )?;
            }
        }
        Ok(())
    }

    /// Spend up to `amount`; an emptied status stops its expiry timer
    pub(crate) fn consume_resource(&mut self, key: &ResourceKey, amount: f64) -> Result<(), EngineError> {
        let now = self.time;
        let rsc = self.resources.get_mut(key)?;
        let spend = amount.min(rsc.available_amount());
        rsc.consume(spend, now);
        if rsc.current_value() <= EPSILON {
            self.resources.remove_timer(&mut self.events, key)?;
        }
        Ok(())
    }

    fn set_combo(&mut self, key: &ResourceKey, value: f64) -> Result<(), EngineError> {
        let now = self.time;
        let rsc = self.resources.get_mut(key)?;
        if value <= EPSILON {
            rsc.consume_all(now);
            return self.resources.remove_timer(&mut self.events, key);
        }
        rsc.override_current_value(value, now);
        if rsc.pending_change().is_some() {
            self.resources.override_timer(&mut self.events, key, COMBO_TIMEOUT)
        } else {
            self.resources
                .add_resource_event(
                    &mut self.events,
                    key,
                    format!("combo {} expires", key),
                    COMBO_TIMEOUT,
                    EventEffect::DropResource { resource: key.clone() },
                )
                .map(|_| ())
        }
    }

    /// Apply or refresh a damage-over-time status
    ///
    /// A refresh cuts the previous application short: its unticked
    /// potencies are discarded and a full new set is created.
    fn apply_dot(
        &mut self,
        node: usize,
        skill: &SkillKey,
        key: &ResourceKey,
        tick_potency: f64,
    ) -> Result<(), EngineError> {
        let Some(duration) = self.status_timeout(key) else {
            warn!(resource = %key, "damage-over-time without a duration");
            return Ok(());
        };
        let now = self.time;
        let display = self.display_time();

        if let Some(old) = self.dots.remove(key) {
            self.derived.truncate_dot(old.node, old.resolved_len());
        }

        let rsc = self.resources.get_mut(key)?;
        if rsc.available(1.0) && rsc.pending_change().is_some() {
            self.resources.override_timer(&mut self.events, key, duration)?;
        } else {
            let gap = if rsc.available(1.0) {
                None
            } else {
                rsc.last_expiration_time().map(|t| now - t)
            };
            rsc.set_enabled(true);
            rsc.override_current_value(1.0, now);
            self.resources.add_resource_event(
                &mut self.events,
                key,
                format!("drop {}", key),
                duration,
                EventEffect::DropResource { resource: key.clone() },
            )?;
            self.reports.push(SimReport::DotApplied {
                time: display,
                resource: key.clone(),
                gap,
            });
        }

        let ticks = DotTracker::tick_count(duration);
        let base = self.config.adjusted_dot_potency(tick_potency);
        let modifiers = self.status_modifiers()?;
        let Some(outcome) = self.derived.get_mut(node) else {
            warn!(node, skill = %skill, "damage-over-time applied by an unknown action");
            return Ok(());
        };
        let first_tick = outcome.dot_potencies.len();
        for _ in 0..ticks {
            let mut potency = Potency::new(skill.clone(), Some(node), outcome.start_lock_time, base)
                .with_description(format!("{} tick", key.name));
            potency.snapshot(display, modifiers.clone());
            outcome.dot_potencies.push(potency);
        }
        self.dots.insert(
            key.clone(),
            DotTracker::new(key.clone(), skill.clone(), node, first_tick, ticks),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{JobCatalog, ProcMode, ResourceOverride, SessionConfig};
    use crate::engine::Engine;
    use crate::report::SimReport;
    use crate::types::EPSILON;
    use std::sync::Arc;

    fn engine(config: SessionConfig) -> Engine {
        let catalog = Arc::new(JobCatalog::demo().unwrap());
        Engine::new(catalog, "demo", config, Vec::new()).unwrap()
    }

    fn never(_: &Engine) -> bool {
        false
    }

    #[test]
    fn test_status_refresh_restarts_timer() {
        let config = SessionConfig {
            initial_resource_overrides: vec![ResourceOverride {
                resource: "fury".to_string(),
                stacks: 1.0,
                timer: Some(15.0),
                enabled: true,
            }],
            ..Default::default()
        };
        let mut e = engine(config);
        let fury = e.catalog().resource_key("demo", "fury").unwrap();
        e.tick(10.0, &never).unwrap();
        assert!((e.time_till_ready(&fury).unwrap() - 5.0).abs() < 1e-6);

        e.gain_status(&fury, 1.0).unwrap();
        assert!((e.time_till_ready(&fury).unwrap() - 15.0).abs() < EPSILON);
        assert!((e.resource_amount(&fury).unwrap() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_fury_modifies_snapshot() {
        let mut e = engine(SessionConfig::default());
        let fury = e.catalog().skill_key("demo", "fury").unwrap();
        let lunge = e.catalog().skill_key("demo", "lunge").unwrap();

        e.use_skill(&fury, 0).unwrap();
        e.tick(0.7, &never).unwrap();
        e.use_skill(&lunge, 1).unwrap();
        let potency = e.derived().get(1).unwrap().potency.clone().unwrap();
        assert_eq!(potency.modifiers.len(), 1);
        assert_eq!(potency.modifiers[0].source, "fury");
    }

    #[test]
    fn test_combo_adds_potency() {
        let config = SessionConfig {
            proc_mode: ProcMode::Never,
            ..Default::default()
        };
        let mut e = engine(config);
        let bolt = e.catalog().skill_key("demo", "bolt").unwrap();
        let surge = e.catalog().skill_key("demo", "surge").unwrap();
        let combo = e.catalog().resource_key("demo", "combo").unwrap();

        e.use_skill(&bolt, 0).unwrap();
        e.tick(3.0, &never).unwrap();
        assert!((e.resource_amount(&combo).unwrap() - 1.0).abs() < EPSILON);

        e.use_skill(&surge, 1).unwrap();
        e.tick(3.0, &never).unwrap();
        let potency = e.derived().get(1).unwrap().potency.clone().unwrap();
        assert!(potency.modifiers.iter().any(|m| m.source == "combo"));
        assert_eq!(e.resource_amount(&combo).unwrap(), 0.0);
    }

    #[test]
    fn test_proc_always() {
        let config = SessionConfig {
            proc_mode: ProcMode::Always,
            ..Default::default()
        };
        let mut e = engine(config);
        let bolt = e.catalog().skill_key("demo", "bolt").unwrap();
        let blaze = e.catalog().skill_key("demo", "blaze").unwrap();
        let firestarter = e.catalog().resource_key("demo", "firestarter").unwrap();

        e.use_skill(&bolt, 0).unwrap();
        e.tick(3.0, &never).unwrap();
        assert!(e.resource_amount(&firestarter).unwrap() > 0.0);

        assert!(e.use_skill(&blaze, 1).unwrap().is_ready());
        assert_eq!(e.resource_amount(&firestarter).unwrap(), 0.0);
        assert_eq!(e.time_till_ready(&firestarter).unwrap(), 0.0);
    }

    #[test]
    fn test_dot_ticks_and_drops() {
        let mut e = engine(SessionConfig::default());
        let ignite = e.catalog().skill_key("demo", "ignite").unwrap();
        let burn = e.catalog().resource_key("demo", "burn").unwrap();

        e.use_skill(&ignite, 0).unwrap();
        e.tick(1.0, &never).unwrap();
        assert!(e.resource_amount(&burn).unwrap() > 0.0);
        assert_eq!(e.derived().get(0).unwrap().dot_potencies.len(), 10);

        e.tick(40.0, &never).unwrap();
        let reports = e.drain_reports();
        let ticks = reports
            .iter()
            .filter(|r| matches!(r, SimReport::DotTick { .. }))
            .count();
        assert!(ticks >= 9 && ticks <= 10);
        assert!(reports.iter().any(|r| matches!(r, SimReport::DotDropped { .. })));
        assert_eq!(e.resource_amount(&burn).unwrap(), 0.0);
        assert_eq!(e.derived().get(0).unwrap().dot_potencies.len(), ticks);
        assert_eq!(e.derived().pending().count(), 0);
    }

    #[test]
    fn test_dot_refresh_discards_unticked() {
        let mut e = engine(SessionConfig::default());
        let ignite = e.catalog().skill_key("demo", "ignite").unwrap();

        e.use_skill(&ignite, 0).unwrap();
        e.tick(10.0, &never).unwrap();
        assert!(e.use_skill(&ignite, 1).unwrap().is_ready());
        e.tick(1.0, &never).unwrap();

        let first = e.derived().get(0).unwrap();
        assert!(first.dot_potencies.iter().all(|p| p.has_resolved()));
        assert!(first.dot_potencies.len() < 10);
        assert_eq!(e.derived().get(1).unwrap().dot_potencies.len(), 10);

        let applications = e
            .drain_reports()
            .into_iter()
            .filter(|r| matches!(r, SimReport::DotApplied { .. }))
            .count();
        assert_eq!(applications, 1);
    }
}
