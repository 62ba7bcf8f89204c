//! Session configuration - character stats and timing constants

use super::ConfigError;
use crate::potency::math::{pre_tax_cast_time, pre_tax_gcd};
use crate::potency::{math, CombatStats};
use crate::types::LevelSync;
use serde::{Deserialize, Serialize};

/// How random procs resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcMode {
    /// Roll with the seeded session RNG
    #[serde(rename = "RNG")]
    Rng,
    Never,
    Always,
}

impl Default for ProcMode {
    fn default() -> Self {
        ProcMode::Never
    }
}

/// Length of the window at the end of a cast in which moving does not
/// interrupt it and the potency has already snapshotted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum SlidecastMode {
    /// 0.46s plus 2% of the cast time
    Scaled,
    /// A fixed window regardless of cast time
    Constant { window: f64 },
}

impl Default for SlidecastMode {
    fn default() -> Self {
        SlidecastMode::Scaled
    }
}

/// Starting state for a resource, applied when a session is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOverride {
    pub resource: String,
    pub stacks: f64,
    /// Seconds until the resource drops, for timed statuses
    #[serde(default)]
    pub timer: Option<f64>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Flat session parameters, fixed for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    pub level: LevelSync,
    pub spell_speed: f64,
    pub critical_hit: f64,
    pub direct_hit: f64,
    pub determination: f64,
    /// Seconds of countdown before the pull; display time 0 is the pull
    pub countdown: f64,
    pub random_seed: u64,
    /// Fixed delay added after every hardcast
    pub caster_tax: f64,
    /// Lock after every instant action without its own lock
    pub animation_lock: f64,
    pub time_till_first_mana_tick: f64,
    pub proc_mode: ProcMode,
    pub slidecast: SlidecastMode,
    /// Damage multiplier of potencies taken under a tincture
    pub tincture_multiplier: f64,
    pub initial_resource_overrides: Vec<ResourceOverride>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            level: LevelSync::Lvl100,
            spell_speed: 1532.0,
            critical_hit: 420.0,
            direct_hit: 420.0,
            determination: 440.0,
            countdown: 5.0,
            random_seed: 0,
            caster_tax: 0.1,
            animation_lock: 0.7,
            time_till_first_mana_tick: 1.2,
            proc_mode: ProcMode::Never,
            slidecast: SlidecastMode::Scaled,
            tincture_multiplier: 1.0,
            initial_resource_overrides: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Reject values the engine cannot simulate
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sub = self.level.sub_stat_base();
        for (name, value) in [
            ("spellSpeed", self.spell_speed),
            ("criticalHit", self.critical_hit),
            ("directHit", self.direct_hit),
        ] {
            if !value.is_finite() || value < sub {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be at least {} at level {}, got {}",
                    name, sub, self.level, value
                )));
            }
        }
        if !self.determination.is_finite() || self.determination < self.level.main_stat_base() {
            return Err(ConfigError::ValidationError(format!(
                "determination must be at least {} at level {}",
                self.level.main_stat_base(),
                self.level
            )));
        }
        for (name, value) in [
            ("countdown", self.countdown),
            ("casterTax", self.caster_tax),
            ("animationLock", self.animation_lock),
            ("timeTillFirstManaTick", self.time_till_first_mana_tick),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.time_till_first_mana_tick > 3.0 {
            return Err(ConfigError::ValidationError(
                "timeTillFirstManaTick must be within one 3s tick".to_string(),
            ));
        }
        if let SlidecastMode::Constant { window } = self.slidecast {
            if !window.is_finite() || window < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "slidecast window must be non-negative, got {}",
                    window
                )));
            }
        }
        if self.tincture_multiplier < 1.0 {
            return Err(ConfigError::ValidationError(
                "tinctureMultiplier cannot reduce damage".to_string(),
            ));
        }
        Ok(())
    }

    /// Stats used by the damage formula
    pub fn stats(&self) -> CombatStats {
        CombatStats {
            level: self.level,
            critical_hit: self.critical_hit,
            direct_hit: self.direct_hit,
            determination: self.determination,
        }
    }

    /// Recast of a GCD with this session's speed and a haste percentage
    pub fn adjusted_gcd(&self, base_gcd: f64, haste: u32) -> f64 {
        pre_tax_gcd(self.level, self.spell_speed, base_gcd, haste)
    }

    /// Cast time with this session's speed and a haste percentage
    pub fn adjusted_cast_time(&self, base_cast_time: f64, haste: u32) -> f64 {
        pre_tax_cast_time(self.level, self.spell_speed, base_cast_time, haste)
    }

    /// Speed-scaled potency of one damage-over-time tick
    pub fn adjusted_dot_potency(&self, base_potency: f64) -> f64 {
        math::overtime_potency(self.level, self.spell_speed, base_potency)
    }

    /// Slidecast window for a cast of `cast_time` seconds
    pub fn slidecast_window(&self, cast_time: f64) -> f64 {
        match self.slidecast {
            SlidecastMode::Scaled => 0.46 + 0.02 * cast_time,
            SlidecastMode::Constant { window } => window,
        }
    }

    /// Convert raw simulation time to time relative to the pull
    pub fn display_time(&self, time: f64) -> f64 {
        time - self.countdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.adjusted_gcd(2.5, 0) - 2.37).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_negative_tax() {
        let config = SessionConfig {
            caster_tax: -0.1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_rejects_stat_below_base() {
        let config = SessionConfig {
            critical_hit: 100.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_slidecast_modes() {
        let scaled = SessionConfig::default();
        assert!((scaled.slidecast_window(2.5) - 0.51).abs() < 1e-9);

        let constant = SessionConfig {
            slidecast: SlidecastMode::Constant { window: 0.5 },
            ..Default::default()
        };
        assert!((constant.slidecast_window(2.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"level": 90, "spellSpeed": 420, "procMode": "Always"}"#).unwrap();
        assert_eq!(config.level, LevelSync::Lvl90);
        assert_eq!(config.proc_mode, ProcMode::Always);
        assert!((config.caster_tax - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_display_time() {
        let config = SessionConfig::default();
        assert!((config.display_time(5.0)).abs() < 1e-9);
        assert!((config.display_time(3.0) + 2.0).abs() < 1e-9);
    }
}
