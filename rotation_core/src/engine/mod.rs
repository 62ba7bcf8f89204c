//! Engine - simulated clock, event loop and all per-session state
//!
//! The engine owns every resource, cooldown and pending event of one
//! session. Time only moves inside [`Engine::tick`]; everything else
//! either reads state or schedules events for the clock to fire.

mod cache;
mod dot;
mod effects;
mod resolve;
mod snapshot;

pub use cache::{DerivedCache, NodeOutcome};
pub use dot::{DotTracker, DOT_TICK_INTERVAL};
pub use snapshot::{CooldownSnapshot, EngineSnapshot, ResourceSnapshot};

use crate::config::{JobCatalog, SessionConfig};
use crate::error::EngineError;
use crate::event::{Event, EventEffect, EventQueue};
use crate::potency::{DamageSummary, PotencyModifier, PotencyTable};
use crate::record::{active_party_buffs, BuffMarker};
use crate::report::SimReport;
use crate::resource::{common, CoolDown, CooldownState, Resource, ResourceState};
use crate::types::{ResourceKey, SkillKey, EPSILON};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Base recast of the global cooldown before speed
pub const BASE_GCD: f64 = 2.5;
/// Seconds between mana ticks
pub const MANA_TICK_INTERVAL: f64 = 3.0;
/// How long a combo stays open
pub const COMBO_TIMEOUT: f64 = 30.0;

/// A hardcast that lost a prerequisite before its snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interruption {
    /// Record index of the interrupted action
    pub node: usize,
    pub skill: SkillKey,
    /// Display time of the interruption
    pub time: f64,
    pub reason: String,
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} was interrupted at {:.3}s: {}", self.skill.name, self.time, self.reason)
    }
}

/// The discrete-event simulation of one character
#[derive(Debug, Clone)]
pub struct Engine {
    catalog: Arc<JobCatalog>,
    job: String,
    config: SessionConfig,
    time: f64,
    resources: ResourceState,
    cooldowns: CooldownState,
    events: EventQueue,
    rng: ChaCha8Rng,
    derived: DerivedCache,
    potencies: PotencyTable,
    dots: BTreeMap<ResourceKey, DotTracker>,
    party_buffs: Vec<BuffMarker>,
    reports: Vec<SimReport>,
    interruption: Option<Interruption>,
}

impl Engine {
    /// Build a fresh engine at time 0 (the start of the countdown)
    pub fn new(
        catalog: Arc<JobCatalog>,
        job: &str,
        config: SessionConfig,
        party_buffs: Vec<BuffMarker>,
    ) -> Result<Self, EngineError> {
        catalog.job(job)?;

        let mut resources = ResourceState::new();
        resources.insert(Resource::new(
            ResourceKey::common(common::MANA),
            common::MAX_MANA,
            common::MAX_MANA,
        ));
        resources.insert(Resource::new(ResourceKey::common(common::IN_COMBAT), 1.0, 0.0));
        for lock in [
            common::NOT_ANIMATION_LOCKED,
            common::NOT_CASTER_TAXED,
            common::MOVEMENT,
        ] {
            resources.insert(Resource::new(ResourceKey::common(lock), 1.0, 1.0));
        }
        for (key, def) in catalog.resources(job)? {
            resources.insert(Resource::new(key.clone(), def.max, def.initial));
        }

        let mut cooldowns = CooldownState::new();
        cooldowns.insert(CoolDown::new(
            ResourceKey::common(common::GCD),
            config.adjusted_gcd(BASE_GCD, 0),
            1,
        ));
        for cd in catalog.cooldowns(job)? {
            cooldowns.insert(CoolDown::new(cd.key.clone(), cd.recast, cd.max_charges));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(config.random_seed);
        let mut events = EventQueue::new();
        events.push_with_logging(
            "mana tick",
            config.time_till_first_mana_tick,
            EventEffect::ManaTick,
            false,
        );
        let dot_offset = rng.gen_range(0.0..DOT_TICK_INTERVAL);
        events.push_with_logging("dot tick", dot_offset, EventEffect::DotTick, false);

        let mut engine = Engine {
            catalog,
            job: job.to_string(),
            config,
            time: 0.0,
            resources,
            cooldowns,
            events,
            rng,
            derived: DerivedCache::new(),
            potencies: PotencyTable::new(),
            dots: BTreeMap::new(),
            party_buffs,
            reports: Vec::new(),
            interruption: None,
        };
        engine.apply_resource_overrides()?;
        Ok(engine)
    }

    fn apply_resource_overrides(&mut self) -> Result<(), EngineError> {
        let overrides = self.config.initial_resource_overrides.clone();
        for o in overrides {
            let key = self.catalog.resource_key(&self.job, &o.resource)?;
            let now = self.time;
            let rsc = self.resources.get_mut(&key)?;
            rsc.override_current_value(o.stacks, now);
            rsc.set_enabled(o.enabled);
            if let Some(timer) = o.timer {
                self.resources.add_resource_event(
                    &mut self.events,
                    &key,
                    format!("drop {}", key),
                    timer,
                    EventEffect::DropResource { resource: key.clone() },
                )?;
            }
        }
        Ok(())
    }

    /// Advance simulated time by up to `delta` seconds
    ///
    /// Events are fired in time order; events due at the same instant fire
    /// in the order they were scheduled. Stops early when `stop` returns
    /// true or a hardcast is interrupted. Returns the time actually advanced.
    pub fn tick(&mut self, delta: f64, stop: &dyn Fn(&Engine) -> bool) -> Result<f64, EngineError> {
        if delta.is_nan() || delta <= 0.0 {
            return Ok(0.0);
        }
        let mut advanced = 0.0;
        loop {
            if self.interruption.is_some() || stop(self) {
                break;
            }
            self.events.sort();
            let remaining = (delta - advanced).max(0.0);
            let next = match self.events.earliest() {
                Some(next) => next,
                None => {
                    self.advance_clock(remaining);
                    advanced += remaining;
                    break;
                }
            };
            if remaining <= 0.0 && next > EPSILON {
                break;
            }
            let step = remaining.min(next.max(0.0));
            self.advance_clock(step);
            advanced += step;

            for event in self.events.take_due() {
                self.fire(event)?;
            }
        }
        Ok(advanced)
    }

    fn advance_clock(&mut self, step: f64) {
        self.time += step;
        self.cooldowns.tick(step);
        self.events.advance(step);
    }

    fn fire(&mut self, event: Event) -> Result<(), EngineError> {
        if let Some(rsc) = event.effect.resource() {
            self.resources.clear_pending(rsc, event.id);
        }
        if event.should_log {
            debug!(time = self.display_time(), event = %event.name, "event fired");
        }

        match event.effect {
            EventEffect::GainResource { resource, amount } => {
                self.resources.get_mut(&resource)?.gain(amount);
            }
            EventEffect::DropResource { resource } => self.drop_resource(&resource)?,
            EventEffect::SpellConfirm { node, skill } => self.confirm_skill(node, &skill)?,
            EventEffect::Application { node, skill } => self.apply_skill(node, &skill)?,
            EventEffect::ManaTick => self.mana_tick()?,
            EventEffect::DotTick => self.dot_tick()?,
        }
        Ok(())
    }

    fn mana_tick(&mut self) -> Result<(), EngineError> {
        let amount = if self.in_combat()? { 200.0 } else { 600.0 };
        let mana = ResourceKey::common(common::MANA);
        let rsc = self.resources.get_mut(&mana)?;
        let before = rsc.available_amount();
        rsc.gain(amount);
        let gained = rsc.available_amount() - before;
        self.reports.push(SimReport::ResourceTick {
            time: self.display_time(),
            resource: mana,
            amount: gained,
        });
        self.events.push_with_logging(
            "mana tick",
            MANA_TICK_INTERVAL,
            EventEffect::ManaTick,
            false,
        );
        Ok(())
    }

    fn dot_tick(&mut self) -> Result<(), EngineError> {
        let display = self.display_time();
        let stats = self.config.stats();
        let keys: Vec<ResourceKey> = self.dots.keys().cloned().collect();
        for key in keys {
            if !self.resources.get(&key)?.available(1.0) {
                continue;
            }
            let Some(tracker) = self.dots.get_mut(&key) else {
                continue;
            };
            let Some(index) = tracker.next_tick() else {
                continue;
            };
            tracker.advance();
            let (node, skill) = (tracker.node, tracker.skill.clone());

            let resolved = match self
                .derived
                .get_mut(node)
                .and_then(|o| o.dot_potencies.get_mut(index))
            {
                Some(p) => {
                    p.resolve(display);
                    p.clone()
                }
                None => continue,
            };
            let party = self.party_buffs_at(resolved.snapshot_time.unwrap_or(display));
            let amount = resolved.amount(&stats, self.config.tincture_multiplier, &party);
            self.potencies.push(resolved);
            self.reports.push(SimReport::DotTick {
                time: display,
                resource: key,
                skill,
                potency: amount,
            });
        }
        self.events.push_with_logging("dot tick", DOT_TICK_INTERVAL, EventEffect::DotTick, false);
        Ok(())
    }

    fn drop_resource(&mut self, key: &ResourceKey) -> Result<(), EngineError> {
        let now = self.time;
        self.resources.get_mut(key)?.consume_all(now);
        if let Some(tracker) = self.dots.remove(key) {
            self.derived.truncate_dot(tracker.node, tracker.resolved_len());
            self.reports.push(SimReport::DotDropped {
                time: self.display_time(),
                resource: key.clone(),
            });
        }
        Ok(())
    }

    /// Turn a toggleable resource on or off; returns the new state
    pub fn toggle_resource(&mut self, key: &ResourceKey) -> Result<bool, EngineError> {
        let toggleable = self
            .catalog
            .resource_definition(key)
            .map(|d| d.toggleable)
            .unwrap_or(false);
        if !toggleable {
            return Err(EngineError::NotToggleable(key.to_string()));
        }
        let rsc = self.resources.get_mut(key)?;
        let enabled = !rsc.enabled();
        rsc.set_enabled(enabled);
        debug!(resource = %key, enabled, "toggled resource");
        Ok(enabled)
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

    /// Raw simulated time since the start of the countdown
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Time relative to the pull
    pub fn display_time(&self) -> f64 {
        self.config.display_time(self.time)
    }

    pub fn resources(&self) -> &ResourceState {
        &self.resources
    }

    pub fn cooldowns(&self) -> &CooldownState {
        &self.cooldowns
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn potency_table(&self) -> &PotencyTable {
        &self.potencies
    }

    pub fn derived(&self) -> &DerivedCache {
        &self.derived
    }

    pub fn active_dots(&self) -> impl Iterator<Item = &DotTracker> {
        self.dots.values()
    }

    pub fn party_buffs(&self) -> &[BuffMarker] {
        &self.party_buffs
    }

    pub fn set_party_buffs(&mut self, markers: Vec<BuffMarker>) {
        self.party_buffs = markers;
    }

    /// Externally reported modifiers active at display time `time`
    pub fn party_buffs_at(&self, time: f64) -> Vec<PotencyModifier> {
        active_party_buffs(&self.party_buffs, time)
    }

    pub fn resource_amount(&self, key: &ResourceKey) -> Result<f64, EngineError> {
        Ok(self.resources.get(key)?.available_amount())
    }

    pub fn time_till_ready(&self, key: &ResourceKey) -> Result<f64, EngineError> {
        self.resources.time_till_ready(key, &self.events)
    }

    pub fn in_combat(&self) -> Result<bool, EngineError> {
        Ok(self
            .resources
            .get(&ResourceKey::common(common::IN_COMBAT))?
            .available(1.0))
    }

    /// Time until neither the animation lock nor the caster tax holds
    pub fn time_till_any_skill_available(&self) -> Result<f64, EngineError> {
        let anim = self.time_till_ready(&ResourceKey::common(common::NOT_ANIMATION_LOCKED))?;
        let tax = self.time_till_ready(&ResourceKey::common(common::NOT_CASTER_TAXED))?;
        Ok(anim.max(tax))
    }

    /// Time until the next mana tick fires
    pub fn time_till_next_mana_tick(&self) -> Option<f64> {
        self.events
            .iter()
            .filter(|e| !e.canceled && e.effect == EventEffect::ManaTick)
            .map(|e| e.time_till_event.max(0.0))
            .min_by(f64::total_cmp)
    }

    pub(crate) fn push_report(&mut self, report: SimReport) {
        self.reports.push(report);
    }

    /// Reports accumulated since the last drain
    pub fn drain_reports(&mut self) -> Vec<SimReport> {
        std::mem::take(&mut self.reports)
    }

    pub fn reports(&self) -> &[SimReport] {
        &self.reports
    }

    /// Take the pending interruption, if a hardcast failed
    pub fn take_interruption(&mut self) -> Option<Interruption> {
        self.interruption.take()
    }

    pub fn interruption(&self) -> Option<&Interruption> {
        self.interruption.as_ref()
    }

    /// Applied and in-flight damage so far
    pub fn damage_summary(&self) -> DamageSummary {
        DamageSummary::collect(
            self.potencies.iter(),
            self.derived.pending(),
            &self.config.stats(),
            self.config.tincture_multiplier,
            |t| self.party_buffs_at(t),
        )
    }

    fn interrupt(&mut self, node: usize, skill: &SkillKey, reason: String) {
        let interruption = Interruption {
            node,
            skill: skill.clone(),
            time: self.display_time(),
            reason,
        };
        info!(%interruption, "hardcast interrupted");
        self.reports.push(SimReport::Interrupted {
            time: interruption.time,
            node,
            skill: skill.clone(),
            reason: interruption.reason.clone(),
        });
        self.interruption = Some(interruption);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::SkillStatus;

    fn demo_engine(config: SessionConfig) -> Engine {
        let catalog = Arc::new(JobCatalog::demo().unwrap());
        Engine::new(catalog, "demo", config, Vec::new()).unwrap()
    }

    fn never(_: &Engine) -> bool {
        false
    }

    #[test]
    fn test_tick_advances_time() {
        let mut engine = demo_engine(SessionConfig::default());
        let advanced = engine.tick(4.0, &never).unwrap();
        assert!((advanced - 4.0).abs() < EPSILON);
        assert!((engine.time() - 4.0).abs() < EPSILON);
        assert!((engine.display_time() + 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_non_positive_tick_is_noop() {
        let mut engine = demo_engine(SessionConfig::default());
        assert_eq!(engine.tick(0.0, &never).unwrap(), 0.0);
        assert_eq!(engine.tick(-3.0, &never).unwrap(), 0.0);
        assert_eq!(engine.time(), 0.0);
    }

    #[test]
    fn test_mana_ticks_out_of_combat() {
        let mut engine = demo_engine(SessionConfig::default());
        let mana = ResourceKey::common(common::MANA);
        engine.resources.get_mut(&mana).unwrap().consume(5000.0, 0.0);

        // First tick at 1.2s, then every 3s
        engine.tick(4.3, &never).unwrap();
        assert!((engine.resource_amount(&mana).unwrap() - 6200.0).abs() < EPSILON);

        let ticks: Vec<_> = engine
            .drain_reports()
            .into_iter()
            .filter(|r| matches!(r, SimReport::ResourceTick { .. }))
            .collect();
        assert_eq!(ticks.len(), 2);
    }

    #[test]
    fn test_stop_predicate_halts_clock() {
        let mut engine = demo_engine(SessionConfig::default());
        let key = engine.catalog.skill_key("demo", "lunge").unwrap();
        assert_eq!(engine.use_skill(&key, 0).unwrap(), SkillStatus::Ready);

        let advanced = engine
            .tick(10.0, &|e: &Engine| e.time_till_any_skill_available().unwrap() <= EPSILON)
            .unwrap();
        // Stops once the animation lock clears
        assert!((advanced - 0.7).abs() < EPSILON);
    }

    #[test]
    fn test_toggle_requires_toggleable() {
        let mut engine = demo_engine(SessionConfig::default());
        let ley = engine.catalog.resource_key("demo", "ley_lines").unwrap();
        assert!(!engine.toggle_resource(&ley).unwrap());
        assert!(engine.toggle_resource(&ley).unwrap());

        let fury = engine.catalog.resource_key("demo", "fury").unwrap();
        assert!(matches!(
            engine.toggle_resource(&fury),
            Err(EngineError::NotToggleable(_))
        ));
    }

    #[test]
    fn test_initial_overrides() {
        let config = SessionConfig {
            initial_resource_overrides: vec![crate::config::ResourceOverride {
                resource: "fury".to_string(),
                stacks: 1.0,
                timer: Some(5.0),
                enabled: true,
            }],
            ..Default::default()
        };
        let mut engine = demo_engine(config);
        let fury = engine.catalog.resource_key("demo", "fury").unwrap();
        assert!((engine.time_till_ready(&fury).unwrap() - 5.0).abs() < EPSILON);

        engine.tick(5.0, &never).unwrap();
        assert_eq!(engine.resource_amount(&fury).unwrap(), 0.0);
    }
}
