//! Skill resolution - availability, use, snapshot and application

use super::{Engine, NodeOutcome, BASE_GCD};
use crate::config::{SkillDefinition, SkillKind};
use crate::error::EngineError;
use crate::event::EventEffect;
use crate::potency::{Potency, PotencyModifier};
use crate::report::SimReport;
use crate::resource::common;
use crate::skill::{SkillAvailability, SkillStatus};
use crate::types::{ResourceKey, SkillKey, EPSILON};
use std::sync::Arc;
use tracing::debug;

impl Engine {
    /// Highest haste granted by any active job resource
    pub(crate) fn active_haste(&self) -> u32 {
        self.resources
            .iter()
            .filter(|r| r.available(1.0))
            .filter_map(|r| self.catalog.resource_definition(&r.key).and_then(|d| d.haste))
            .max()
            .unwrap_or(0)
    }

    /// First available status that would make this cast instant
    fn instant_source(&self, def: &SkillDefinition<ResourceKey>) -> Result<Option<ResourceKey>, EngineError> {
        if def.cast_time <= 0.0 {
            return Ok(None);
        }
        for key in &def.instant_with {
            if self.resources.get(key)?.available(1.0) {
                return Ok(Some(key.clone()));
            }
        }
        Ok(None)
    }

    /// Recast time scale and recast a GCD skill would roll right now
    fn gcd_recast(&self, def: &SkillDefinition<ResourceKey>, haste: u32) -> (f64, f64) {
        let scale = self.config.adjusted_gcd(BASE_GCD, haste) / self.config.adjusted_gcd(BASE_GCD, 0);
        (scale, self.config.adjusted_gcd(def.recast_time, 0) * scale)
    }

    /// Evaluate whether a skill can be used now, and what it would do
    pub fn skill_availability(&self, key: &SkillKey) -> Result<SkillAvailability, EngineError> {
        let skill = self.catalog.skill(key)?;
        let def = &skill.def;
        let haste = self.active_haste();

        let instant_source = self.instant_source(def)?;
        let cast_time = if def.cast_time > 0.0 && instant_source.is_none() {
            self.config.adjusted_cast_time(def.cast_time, haste)
        } else {
            0.0
        };

        let cd = self.cooldowns.get(&skill.cooldown)?;
        let time_till_available = self
            .time_till_any_skill_available()?
            .max(cd.time_till_any_stack_available());
        let recast = if def.kind.is_gcd() {
            self.gcd_recast(def, haste).1
        } else {
            def.recast_time
        };

        let mana = self.resources.get(&ResourceKey::common(common::MANA))?;
        let status = if self.config.level.level() < def.unlock_level {
            SkillStatus::NotUnlocked {
                required_level: def.unlock_level,
            }
        } else if def.requires_combat && !self.in_combat()? {
            SkillStatus::NotInCombat
        } else if let Some(reason) = self.unmet_requirement(&def.requirements)? {
            SkillStatus::RequirementsNotMet { reason }
        } else if def.mana_cost > 0.0 && !mana.available(def.mana_cost) {
            SkillStatus::InsufficientResource {
                resource: mana.key.to_string(),
                needed: def.mana_cost,
                available: mana.available_amount(),
            }
        } else if time_till_available > EPSILON {
            SkillStatus::Blocked { time_till_available }
        } else {
            SkillStatus::Ready
        };

        let snapshot_delay = if cast_time > 0.0 {
            (cast_time - self.config.slidecast_window(cast_time)).max(0.0)
        } else {
            0.0
        };

        Ok(SkillAvailability {
            skill: key.clone(),
            status,
            time_till_available,
            cast_time,
            instant: cast_time <= 0.0,
            stacks_available: cd.stacks_available(),
            max_stacks: cd.max_stacks(),
            recast,
            mana_cost: def.mana_cost,
            time_till_damage_application: time_till_available + snapshot_delay + def.application_delay,
        })
    }

    /// Availability of every skill of this engine's job
    pub fn skill_availabilities(&self) -> Result<Vec<SkillAvailability>, EngineError> {
        self.catalog
            .skills(&self.job)?
            .map(|s| self.skill_availability(&s.key))
            .collect()
    }

    /// Use a skill as record entry `node`
    ///
    /// Nothing changes unless the skill is ready; the returned status says
    /// why not. Hardcasts schedule their snapshot, instants snapshot at once.
    pub fn use_skill(&mut self, key: &SkillKey, node: usize) -> Result<SkillStatus, EngineError> {
        let availability = self.skill_availability(key)?;
        if !availability.is_ready() {
            return Ok(availability.status);
        }

        let catalog = Arc::clone(&self.catalog);
        let skill = catalog.skill(key)?;
        let def = &skill.def;
        let haste = self.active_haste();
        let now = self.time;
        let now_display = self.display_time();

        if availability.cast_time <= 0.0 {
            if let Some(source) = self.instant_source(def)? {
                self.consume_resource(&source, 1.0)?;
            }
        }

        let (scale, recast) = self.gcd_recast(def, haste);
        let cd = self.cooldowns.get_mut(&skill.cooldown)?;
        if def.kind.is_gcd() {
            cd.set_recast_time_scale(scale);
            if (def.recast_time - BASE_GCD).abs() > EPSILON {
                cd.use_stack_with_recast(recast / scale);
            } else {
                cd.use_stack();
            }
        } else {
            cd.use_stack();
        }

        let cast = availability.cast_time;
        let lock = if cast > 0.0 {
            cast + self.config.caster_tax
        } else {
            def.animation_lock.unwrap_or(self.config.animation_lock)
        };
        let mut outcome = NodeOutcome::new(key.clone(), now_display, now_display + lock, cast);
        if def.potency > 0.0 {
            outcome.potency = Some(Potency::new(key.clone(), Some(node), now_display, def.potency));
        }
        self.derived.insert(node, outcome);

        debug!(time = now_display, skill = %key, node, cast, "skill used");

        if cast > 0.0 {
            let snapshot_delay = (cast - self.config.slidecast_window(cast)).max(0.0);
            let movement = ResourceKey::common(common::MOVEMENT);
            let taxed = ResourceKey::common(common::NOT_CASTER_TAXED);
            self.resources
                .take_resource_lock(&mut self.events, &movement, snapshot_delay, now)?;
            self.resources.take_resource_lock(&mut self.events, &taxed, lock, now)?;
            self.events.push(
                format!("{} snapshot", key),
                snapshot_delay,
                EventEffect::SpellConfirm {
                    node,
                    skill: key.clone(),
                },
            );
        } else {
            let anim = ResourceKey::common(common::NOT_ANIMATION_LOCKED);
            self.resources.take_resource_lock(&mut self.events, &anim, lock, now)?;
            self.confirm_skill(node, key)?;
        }
        Ok(SkillStatus::Ready)
    }

    /// Snapshot point: pay the cost, freeze modifiers, run confirm effects
    pub(crate) fn confirm_skill(&mut self, node: usize, key: &SkillKey) -> Result<(), EngineError> {
        let catalog = Arc::clone(&self.catalog);
        let def = &catalog.skill(key)?.def;

        if let Some(reason) = self.unmet_requirement(&def.requirements)? {
            self.interrupt(node, key, reason);
            return Ok(());
        }
        if def.mana_cost > 0.0 {
            let mana = ResourceKey::common(common::MANA);
            let now = self.time;
            let rsc = self.resources.get_mut(&mana)?;
            if !rsc.available(def.mana_cost) {
                let reason = format!(
                    "needs {} {} but only {} available",
                    def.mana_cost,
                    mana,
                    rsc.available_amount()
                );
                self.interrupt(node, key, reason);
                return Ok(());
            }
            rsc.consume(def.mana_cost, now);
        }

        let mut modifiers = self.status_modifiers()?;
        for conditional in &def.modifiers {
            if self.requirement_failure(&conditional.when)?.is_none() {
                modifiers.push(PotencyModifier::new(
                    conditional.source.clone(),
                    conditional.modifier.clone(),
                ));
            }
        }
        let display = self.display_time();
        if let Some(potency) = self.derived.potency_mut(node) {
            potency.snapshot(display, modifiers);
        }

        self.run_effects(node, key, &def.on_confirm)?;

        if def.application_delay <= EPSILON {
            self.apply_skill(node, key)?;
        } else {
            self.events.push(
                format!("{} application", key),
                def.application_delay,
                EventEffect::Application {
                    node,
                    skill: key.clone(),
                },
            );
        }
        Ok(())
    }

    /// Damage lands: resolve the potency and run application effects
    pub(crate) fn apply_skill(&mut self, node: usize, key: &SkillKey) -> Result<(), EngineError> {
        let display = self.display_time();
        let resolved = self.derived.potency_mut(node).map(|p| {
            p.resolve(display);
            p.clone()
        });

        if let Some(potency) = resolved {
            self.resources
                .get_mut(&ResourceKey::common(common::IN_COMBAT))?
                .gain(1.0);
            let party = self.party_buffs_at(potency.snapshot_time.unwrap_or(display));
            let amount = potency.amount(&self.config.stats(), self.config.tincture_multiplier, &party);
            self.potencies.push(potency);
            self.reports.push(SimReport::DamageApplied {
                time: display,
                skill: key.clone(),
                node: Some(node),
                potency: amount,
            });
        }

        let catalog = Arc::clone(&self.catalog);
        let def = &catalog.skill(key)?.def;
        self.run_effects(node, key, &def.on_application)
    }

    /// Whether the skill is a GCD spell or weaponskill
    pub fn is_gcd(&self, key: &SkillKey) -> Result<bool, EngineError> {
        Ok(!matches!(self.catalog.skill(key)?.def.kind, SkillKind::Ability))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{JobCatalog, SessionConfig, SlidecastMode};
    use crate::engine::Engine;
    use crate::resource::common;
    use crate::skill::SkillStatus;
    use crate::types::{ResourceKey, EPSILON};
    use std::sync::Arc;

    fn engine(config: SessionConfig) -> Engine {
        let catalog = Arc::new(JobCatalog::demo().unwrap());
        Engine::new(catalog, "demo", config, Vec::new()).unwrap()
    }

    fn never(_: &Engine) -> bool {
        false
    }

    #[test]
    fn test_hardcast_snapshots_before_cast_ends() {
        let config = SessionConfig {
            spell_speed: 420.0,
            slidecast: SlidecastMode::Constant { window: 0.5 },
            ..Default::default()
        };
        let mut e = engine(config);
        let surge = e.catalog().skill_key("demo", "surge").unwrap();

        let availability = e.skill_availability(&surge).unwrap();
        assert!((availability.cast_time - 2.0).abs() < EPSILON);
        assert!((availability.time_till_damage_application - 2.1).abs() < EPSILON);

        assert!(e.use_skill(&surge, 0).unwrap().is_ready());
        e.tick(1.5, &never).unwrap();
        let potency = e.derived().get(0).unwrap().potency.as_ref().unwrap();
        assert!(potency.has_snapshotted());
        assert!(!potency.has_resolved());

        e.tick(0.6, &never).unwrap();
        let applied = &e.potency_table().entries()[0];
        assert!((applied.application_time.unwrap() - (2.1 - 5.0)).abs() < EPSILON);
    }

    #[test]
    fn test_mana_spent_at_snapshot() {
        let mut e = engine(SessionConfig::default());
        let bolt = e.catalog().skill_key("demo", "bolt").unwrap();
        let mana = ResourceKey::common(common::MANA);

        e.use_skill(&bolt, 0).unwrap();
        assert!((e.resource_amount(&mana).unwrap() - 10000.0).abs() < EPSILON);
        e.tick(2.5, &never).unwrap();
        assert!((e.resource_amount(&mana).unwrap() - 9600.0).abs() < EPSILON);
    }

    #[test]
    fn test_blocked_while_casting() {
        let mut e = engine(SessionConfig::default());
        let bolt = e.catalog().skill_key("demo", "bolt").unwrap();
        let swiftcast = e.catalog().skill_key("demo", "swiftcast").unwrap();

        e.use_skill(&bolt, 0).unwrap();
        let status = e.use_skill(&swiftcast, 1).unwrap();
        assert!(matches!(status, SkillStatus::Blocked { .. }));
        assert!(e.derived().get(1).is_none());
    }

    #[test]
    fn test_swift_makes_cast_instant() {
        let mut e = engine(SessionConfig::default());
        let swiftcast = e.catalog().skill_key("demo", "swiftcast").unwrap();
        let bolt = e.catalog().skill_key("demo", "bolt").unwrap();
        let swift = e.catalog().resource_key("demo", "swift").unwrap();

        e.use_skill(&swiftcast, 0).unwrap();
        e.tick(0.7, &never).unwrap();
        assert!(e.skill_availability(&bolt).unwrap().instant);

        e.use_skill(&bolt, 1).unwrap();
        assert_eq!(e.resource_amount(&swift).unwrap(), 0.0);
        assert_eq!(e.time_till_ready(&swift).unwrap(), 0.0);
        assert!(e.derived().get(1).unwrap().potency.as_ref().unwrap().has_snapshotted());
    }

    #[test]
    fn test_level_gate() {
        let config = SessionConfig {
            level: crate::types::LevelSync::Lvl80,
            ..Default::default()
        };
        let e = engine(config);
        let flare = e.catalog().skill_key("demo", "flare").unwrap();
        assert_eq!(
            e.skill_availability(&flare).unwrap().status,
            SkillStatus::NotUnlocked { required_level: 90 }
        );
    }

    #[test]
    fn test_finisher_needs_combat() {
        let mut e = engine(SessionConfig::default());
        let finisher = e.catalog().skill_key("demo", "finisher").unwrap();
        let lunge = e.catalog().skill_key("demo", "lunge").unwrap();
        assert_eq!(e.use_skill(&finisher, 0).unwrap(), SkillStatus::NotInCombat);

        e.use_skill(&lunge, 0).unwrap();
        e.tick(0.7, &never).unwrap();
        assert!(e.in_combat().unwrap());
        assert!(e.use_skill(&finisher, 1).unwrap().is_ready());
    }

    #[test]
    fn test_charges() {
        let mut e = engine(SessionConfig::default());
        let double_tap = e.catalog().skill_key("demo", "double_tap").unwrap();
        assert!(e.use_skill(&double_tap, 0).unwrap().is_ready());
        e.tick(0.7, &never).unwrap();
        assert!(e.use_skill(&double_tap, 1).unwrap().is_ready());
        e.tick(0.7, &never).unwrap();

        let availability = e.skill_availability(&double_tap).unwrap();
        assert_eq!(availability.stacks_available, 0);
        assert!((availability.time_till_available - 28.6).abs() < 1e-6);
    }

    #[test]
    fn test_haste_shortens_gcd() {
        let mut e = engine(SessionConfig::default());
        let ley = e.catalog().skill_key("demo", "ley_lines").unwrap();
        let bolt = e.catalog().skill_key("demo", "bolt").unwrap();
        let before = e.skill_availability(&bolt).unwrap();

        e.use_skill(&ley, 0).unwrap();
        let after = e.skill_availability(&bolt).unwrap();
        assert!(after.cast_time < before.cast_time);
        assert!(after.recast < before.recast);
    }
}
