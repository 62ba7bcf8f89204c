//! Job catalog - skill and resource definitions supplied as data
//!
//! Job files name resources with plain strings. Building the catalog
//! resolves every name to a namespaced [`ResourceKey`] (job-local first,
//! then the built-in common resources) so lookups never fail at run time
//! for a catalog that loaded successfully.

use super::ConfigError;
use crate::error::EngineError;
use crate::potency::ModifierKind;
use crate::resource::common;
use crate::types::{ResourceKey, SkillKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Broad category of a skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Spell,
    Weaponskill,
    Ability,
}

impl SkillKind {
    /// Whether the skill rolls the shared global cooldown
    pub fn is_gcd(self) -> bool {
        !matches!(self, SkillKind::Ability)
    }
}

/// Condition evaluated against the current resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement<K = String> {
    HasResource {
        resource: K,
        #[serde(default = "default_one")]
        at_least: f64,
    },
    LacksResource {
        resource: K,
    },
    ResourceAtMost {
        resource: K,
        at_most: f64,
    },
    InCombat,
}

/// Mutation applied when a skill confirms or lands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect<K = String> {
    /// Grant a timed status; refreshing restarts its timer
    GainStatus {
        resource: K,
        #[serde(default = "default_one")]
        stacks: f64,
    },
    Gain {
        resource: K,
        amount: f64,
    },
    Consume {
        resource: K,
        amount: f64,
    },
    ConsumeAll {
        resource: K,
    },
    /// Set a combo counter; any non-zero value expires after 30s
    SetCombo {
        resource: K,
        value: f64,
    },
    /// Apply (or refresh) a damage-over-time status
    ApplyDot {
        resource: K,
        tick_potency: f64,
    },
    /// Possibly grant a status, depending on the session's proc mode
    MaybeGainProc {
        resource: K,
        chance: f64,
    },
}

/// Modifier a skill receives while a condition holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalModifier<K = String> {
    pub when: Requirement<K>,
    pub source: String,
    pub modifier: ModifierKind,
}

/// A resource declared by a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub name: String,
    #[serde(default = "default_one")]
    pub max: f64,
    #[serde(default)]
    pub initial: f64,
    /// Seconds a granted status lasts
    #[serde(default)]
    pub timeout: Option<f64>,
    /// Whether the user may switch the resource on and off
    #[serde(default)]
    pub toggleable: bool,
    /// Percentage speed-up to casts and GCDs while the resource is active
    #[serde(default)]
    pub haste: Option<u32>,
    /// Applied to every potency snapshotted while the resource is active
    #[serde(default)]
    pub potency_modifier: Option<ModifierKind>,
    /// Whether the resource is a damage-over-time status
    #[serde(default)]
    pub dot: bool,
}

/// A skill as written in a job file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition<K = String> {
    pub name: String,
    pub kind: SkillKind,
    #[serde(default = "default_unlock_level")]
    pub unlock_level: u32,
    #[serde(default)]
    pub cast_time: f64,
    #[serde(default = "default_recast")]
    pub recast_time: f64,
    #[serde(default = "default_charges")]
    pub max_charges: u32,
    /// Cooldown shared with other abilities; defaults to one per ability
    #[serde(default)]
    pub cooldown_group: Option<String>,
    #[serde(default)]
    pub mana_cost: f64,
    #[serde(default)]
    pub potency: f64,
    /// Delay between the snapshot and the damage landing
    #[serde(default)]
    pub application_delay: f64,
    #[serde(default)]
    pub animation_lock: Option<f64>,
    #[serde(default)]
    pub requires_combat: bool,
    #[serde(default)]
    pub requirements: Vec<Requirement<K>>,
    /// Statuses that make the cast instant; the first available is consumed
    #[serde(default)]
    pub instant_with: Vec<K>,
    #[serde(default)]
    pub modifiers: Vec<ConditionalModifier<K>>,
    #[serde(default)]
    pub on_confirm: Vec<Effect<K>>,
    #[serde(default)]
    pub on_application: Vec<Effect<K>>,
}

fn default_one() -> f64 {
    1.0
}

fn default_unlock_level() -> u32 {
    1
}

fn default_recast() -> f64 {
    2.5
}

fn default_charges() -> u32 {
    1
}

/// Identity of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    pub id: String,
    pub name: String,
}

/// One job file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    pub job: JobInfo,
    #[serde(default)]
    pub resources: Vec<ResourceDefinition>,
    #[serde(default)]
    pub skills: Vec<SkillDefinition>,
}

/// Recast settings of one cooldown
#[derive(Debug, Clone, PartialEq)]
pub struct CooldownDefinition {
    pub key: ResourceKey,
    pub recast: f64,
    pub max_charges: u32,
}

/// A skill whose resource names have been resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSkill {
    pub key: SkillKey,
    /// Cooldown this skill spends a charge of
    pub cooldown: ResourceKey,
    pub def: SkillDefinition<ResourceKey>,
}

#[derive(Debug, Clone)]
struct JobData {
    info: JobInfo,
    resources: BTreeMap<ResourceKey, ResourceDefinition>,
    skills: BTreeMap<SkillKey, ResolvedSkill>,
    cooldowns: BTreeMap<ResourceKey, CooldownDefinition>,
}

/// Single lookup table for every job's skills, resources and cooldowns
#[derive(Debug, Clone, Default)]
pub struct JobCatalog {
    jobs: BTreeMap<String, JobData>,
}

type Resolver<'a> = dyn Fn(&str) -> Result<ResourceKey, ConfigError> + 'a;

impl Requirement<String> {
    fn resolve(self, r: &Resolver) -> Result<Requirement<ResourceKey>, ConfigError> {
        Ok(match self {
            Requirement::HasResource { resource, at_least } => Requirement::HasResource {
                resource: r(resource.as_str())?,
                at_least,
            },
            Requirement::LacksResource { resource } => Requirement::LacksResource {
                resource: r(resource.as_str())?,
            },
            Requirement::ResourceAtMost { resource, at_most } => Requirement::ResourceAtMost {
                resource: r(resource.as_str())?,
                at_most,
            },
            Requirement::InCombat => Requirement::InCombat,
        })
    }
}

impl Effect<String> {
    fn resolve(self, r: &Resolver) -> Result<Effect<ResourceKey>, ConfigError> {
        Ok(match self {
            Effect::GainStatus { resource, stacks } => Effect::GainStatus {
                resource: r(resource.as_str())?,
                stacks,
            },
            Effect::Gain { resource, amount } => Effect::Gain {
                resource: r(resource.as_str())?,
                amount,
            },
            Effect::Consume { resource, amount } => Effect::Consume {
                resource: r(resource.as_str())?,
                amount,
            },
            Effect::ConsumeAll { resource } => Effect::ConsumeAll {
                resource: r(resource.as_str())?,
            },
            Effect::SetCombo { resource, value } => Effect::SetCombo {
                resource: r(resource.as_str())?,
                value,
            },
            Effect::ApplyDot {
                resource,
                tick_potency,
            } => Effect::ApplyDot {
                resource: r(resource.as_str())?,
                tick_potency,
            },
            Effect::MaybeGainProc { resource, chance } => Effect::MaybeGainProc {
                resource: r(resource.as_str())?,
                chance,
            },
        })
    }
}

impl SkillDefinition<String> {
    fn resolve(self, r: &Resolver) -> Result<SkillDefinition<ResourceKey>, ConfigError> {
        let requirements = self
            .requirements
            .into_iter()
            .map(|req| req.resolve(r))
            .collect::<Result<Vec<_>, _>>()?;
        let instant_with = self
            .instant_with
            .iter()
            .map(|name| r(name.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let modifiers = self
            .modifiers
            .into_iter()
            .map(|m| {
                Ok(ConditionalModifier {
                    when: m.when.resolve(r)?,
                    source: m.source,
                    modifier: m.modifier,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let on_confirm = self
            .on_confirm
            .into_iter()
            .map(|e| e.resolve(r))
            .collect::<Result<Vec<_>, _>>()?;
        let on_application = self
            .on_application
            .into_iter()
            .map(|e| e.resolve(r))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SkillDefinition {
            name: self.name,
            kind: self.kind,
            unlock_level: self.unlock_level,
            cast_time: self.cast_time,
            recast_time: self.recast_time,
            max_charges: self.max_charges,
            cooldown_group: self.cooldown_group,
            mana_cost: self.mana_cost,
            potency: self.potency,
            application_delay: self.application_delay,
            animation_lock: self.animation_lock,
            requires_combat: self.requires_combat,
            requirements,
            instant_with,
            modifiers,
            on_confirm,
            on_application,
        })
    }
}

impl SkillDefinition<ResourceKey> {
    /// Every effect this skill runs, confirm first
    pub fn effects(&self) -> impl Iterator<Item = &Effect<ResourceKey>> {
        self.on_confirm.iter().chain(self.on_application.iter())
    }
}

fn validation(msg: String) -> ConfigError {
    ConfigError::ValidationError(msg)
}

fn validate_resource(def: &ResourceDefinition) -> Result<(), ConfigError> {
    if def.name.is_empty() {
        return Err(validation("resource with an empty name".to_string()));
    }
    if !(def.max > 0.0) || def.initial < 0.0 || def.initial > def.max {
        return Err(validation(format!(
            "resource '{}' must have 0 <= initial <= max and max > 0",
            def.name
        )));
    }
    if let Some(timeout) = def.timeout {
        if !(timeout > 0.0) {
            return Err(validation(format!("resource '{}' has a non-positive timeout", def.name)));
        }
    }
    if def.dot && def.timeout.is_none() {
        return Err(validation(format!("damage-over-time '{}' needs a timeout", def.name)));
    }
    if matches!(def.haste, Some(h) if h >= 100) {
        return Err(validation(format!("resource '{}' haste must be below 100", def.name)));
    }
    Ok(())
}

fn validate_skill(def: &SkillDefinition) -> Result<(), ConfigError> {
    let fail = |what: &str| Err(validation(format!("skill '{}': {}", def.name, what)));
    if def.name.is_empty() {
        return Err(validation("skill with an empty name".to_string()));
    }
    if def.cast_time < 0.0 || def.application_delay < 0.0 || def.mana_cost < 0.0 {
        return fail("cast time, application delay and mana cost must be non-negative");
    }
    if !(def.recast_time > 0.0) {
        return fail("recast time must be positive");
    }
    if def.max_charges == 0 {
        return fail("needs at least one charge");
    }
    if def.kind.is_gcd() && def.max_charges != 1 {
        return fail("GCD skills share the single-charge global cooldown");
    }
    if matches!(def.animation_lock, Some(lock) if lock < 0.0) {
        return fail("animation lock must be non-negative");
    }
    Ok(())
}

impl JobCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        JobCatalog {
            jobs: BTreeMap::new(),
        }
    }

    /// Parse a catalog holding one job from TOML
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let def: JobDefinition = super::parse_toml(content)?;
        let mut catalog = Self::new();
        catalog.add_job(def)?;
        Ok(catalog)
    }

    /// Load one or more job files
    pub fn load(paths: &[&Path]) -> Result<Self, ConfigError> {
        let mut catalog = Self::new();
        for path in paths {
            let def: JobDefinition = super::load_toml(path)?;
            catalog.add_job(def)?;
        }
        Ok(catalog)
    }

    /// The bundled demo job
    pub fn demo() -> Result<Self, ConfigError> {
        Self::from_toml(include_str!("../../config/demo_job.toml"))
    }

    /// Validate a job definition and add it to the catalog
    pub fn add_job(&mut self, def: JobDefinition) -> Result<(), ConfigError> {
        let job_id = def.job.id.clone();
        if job_id.is_empty() {
            return Err(validation("job with an empty id".to_string()));
        }
        if self.jobs.contains_key(&job_id) {
            return Err(validation(format!("job '{}' defined twice", job_id)));
        }

        let mut resources = BTreeMap::new();
        for rsc in def.resources {
            validate_resource(&rsc)?;
            let key = ResourceKey::job(&job_id, &rsc.name);
            if resources.contains_key(&key) {
                return Err(validation(format!("resource '{}' defined twice", key)));
            }
            resources.insert(key, rsc);
        }

        let resolver = |name: &str| -> Result<ResourceKey, ConfigError> {
            let local = ResourceKey::job(&job_id, name);
            if resources.contains_key(&local) {
                Ok(local)
            } else if common::RESOURCES.contains(&name) {
                Ok(ResourceKey::common(name))
            } else {
                Err(validation(format!("unknown resource '{}' in job '{}'", name, job_id)))
            }
        };

        let mut skills = BTreeMap::new();
        let mut cooldowns: BTreeMap<ResourceKey, CooldownDefinition> = BTreeMap::new();
        for skill in def.skills {
            validate_skill(&skill)?;
            let key = SkillKey::new(&job_id, &skill.name);
            if skills.contains_key(&key) {
                return Err(validation(format!("skill '{}' defined twice", key)));
            }

            let cooldown = if skill.kind.is_gcd() {
                ResourceKey::common(common::GCD)
            } else {
                let group = skill
                    .cooldown_group
                    .clone()
                    .unwrap_or_else(|| format!("cd_{}", skill.name));
                let cd_key = ResourceKey::job(&job_id, &group);
                match cooldowns.get(&cd_key) {
                    Some(existing)
                        if (existing.recast - skill.recast_time).abs() > f64::EPSILON
                            || existing.max_charges != skill.max_charges =>
                    {
                        return Err(validation(format!(
                            "cooldown group '{}' has conflicting recasts",
                            cd_key
                        )));
                    }
                    Some(_) => {}
                    None => {
                        cooldowns.insert(
                            cd_key.clone(),
                            CooldownDefinition {
                                key: cd_key.clone(),
                                recast: skill.recast_time,
                                max_charges: skill.max_charges,
                            },
                        );
                    }
                }
                cd_key
            };

            let def = skill.resolve(&resolver)?;
            for effect in def.effects() {
                if let Effect::ApplyDot { resource, .. } = effect {
                    let is_dot = resources.get(resource).map(|r| r.dot).unwrap_or(false);
                    if !is_dot {
                        return Err(validation(format!(
                            "skill '{}' applies '{}' which is not a damage-over-time",
                            key, resource
                        )));
                    }
                }
            }
            skills.insert(key.clone(), ResolvedSkill { key, cooldown, def });
        }

        self.jobs.insert(
            job_id,
            JobData {
                info: def.job,
                resources,
                skills,
                cooldowns,
            },
        );
        Ok(())
    }

    fn job_data(&self, job: &str) -> Result<&JobData, EngineError> {
        self.jobs
            .get(job)
            .ok_or_else(|| EngineError::UnknownJob(job.to_string()))
    }

    pub fn job(&self, job: &str) -> Result<&JobInfo, EngineError> {
        Ok(&self.job_data(job)?.info)
    }

    pub fn job_ids(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(|k| k.as_str())
    }

    /// Resolve a skill name within a job
    pub fn skill_key(&self, job: &str, name: &str) -> Result<SkillKey, EngineError> {
        let key = SkillKey::new(job, name);
        if self.job_data(job)?.skills.contains_key(&key) {
            Ok(key)
        } else {
            Err(EngineError::UnknownSkill(key.to_string()))
        }
    }

    /// Resolve a resource name: job-local first, then common
    pub fn resource_key(&self, job: &str, name: &str) -> Result<ResourceKey, EngineError> {
        let data = self.job_data(job)?;
        let local = ResourceKey::job(job, name);
        if data.resources.contains_key(&local) {
            Ok(local)
        } else if common::RESOURCES.contains(&name) {
            Ok(ResourceKey::common(name))
        } else {
            Err(EngineError::UnknownResource(local.to_string()))
        }
    }

    pub fn skill(&self, key: &SkillKey) -> Result<&ResolvedSkill, EngineError> {
        self.job_data(&key.job)?
            .skills
            .get(key)
            .ok_or_else(|| EngineError::UnknownSkill(key.to_string()))
    }

    pub fn skills(&self, job: &str) -> Result<impl Iterator<Item = &ResolvedSkill>, EngineError> {
        Ok(self.job_data(job)?.skills.values())
    }

    /// Definition of a job-local resource (common resources have none)
    pub fn resource_definition(&self, key: &ResourceKey) -> Option<&ResourceDefinition> {
        match &key.namespace {
            crate::types::Namespace::Job(job) => self.jobs.get(job)?.resources.get(key),
            crate::types::Namespace::Common => None,
        }
    }

    pub fn resources(
        &self,
        job: &str,
    ) -> Result<impl Iterator<Item = (&ResourceKey, &ResourceDefinition)>, EngineError> {
        Ok(self.job_data(job)?.resources.iter())
    }

    pub fn cooldowns(&self, job: &str) -> Result<impl Iterator<Item = &CooldownDefinition>, EngineError> {
        Ok(self.job_data(job)?.cooldowns.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINI: &str = r#"
[job]
id = "mini"
name = "Mini"

[[resources]]
name = "fury"
timeout = 15.0
potency_modifier = { kind = "multiplier", factor = 1.1 }

[[skills]]
name = "bolt"
kind = "spell"
cast_time = 2.5
potency = 300
requirements = [{ type = "lacks_resource", resource = "fury" }]
on_confirm = [{ type = "gain", resource = "mana", amount = 100 }]

[[skills]]
name = "fury"
kind = "ability"
recast_time = 60.0
on_confirm = [{ type = "gain_status", resource = "fury" }]
"#;

    #[test]
    fn test_parse_and_resolve() {
        let catalog = JobCatalog::from_toml(MINI).unwrap();
        let bolt = catalog.skill(&catalog.skill_key("mini", "bolt").unwrap()).unwrap();

        assert_eq!(bolt.cooldown, ResourceKey::common("gcd"));
        assert_eq!(
            bolt.def.requirements[0],
            Requirement::LacksResource {
                resource: ResourceKey::job("mini", "fury")
            }
        );
        assert_eq!(
            bolt.def.on_confirm[0],
            Effect::Gain {
                resource: ResourceKey::common("mana"),
                amount: 100.0
            }
        );

        let fury = catalog.skill(&catalog.skill_key("mini", "fury").unwrap()).unwrap();
        assert_eq!(fury.cooldown, ResourceKey::job("mini", "cd_fury"));
        assert_eq!(catalog.cooldowns("mini").unwrap().count(), 1);
    }

    #[test]
    fn test_unknown_resource_rejected() {
        let bad = MINI.replace("resource = \"mana\"", "resource = \"manna\"");
        let err = JobCatalog::from_toml(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(msg) if msg.contains("manna")));
    }

    #[test]
    fn test_unknown_skill_lookup() {
        let catalog = JobCatalog::from_toml(MINI).unwrap();
        assert_eq!(
            catalog.skill_key("mini", "meteor").unwrap_err(),
            EngineError::UnknownSkill("mini/meteor".to_string())
        );
        assert!(matches!(
            catalog.skill_key("other", "bolt"),
            Err(EngineError::UnknownJob(_))
        ));
    }

    #[test]
    fn test_gcd_charges_rejected() {
        let bad = MINI.replace("cast_time = 2.5", "cast_time = 2.5\nmax_charges = 2");
        assert!(JobCatalog::from_toml(&bad).is_err());
    }

    #[test]
    fn test_dot_effect_must_target_dot() {
        let bad = MINI.replace(
            "on_confirm = [{ type = \"gain_status\", resource = \"fury\" }]",
            "on_confirm = [{ type = \"apply_dot\", resource = \"fury\", tick_potency = 40 }]",
        );
        assert!(JobCatalog::from_toml(&bad).is_err());
    }

    #[test]
    fn test_demo_job_loads() {
        let catalog = JobCatalog::demo().unwrap();
        assert!(catalog.skill_key("demo", "bolt").is_ok());
        assert!(catalog.resource_key("demo", "ley_lines").is_ok());
        assert_eq!(
            catalog.resource_key("demo", "mana").unwrap(),
            ResourceKey::common("mana")
        );
    }
}
