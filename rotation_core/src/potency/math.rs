//! Stat formulas - crit, direct hit, determination, speed and the expected
//! damage multiplier

use crate::types::LevelSync;
use serde::{Deserialize, Serialize};

/// Damage multiplier of a direct hit
pub const DIRECT_HIT_MULTIPLIER: f64 = 1.25;

/// Character stats that feed the damage formula
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    pub level: LevelSync,
    pub critical_hit: f64,
    pub direct_hit: f64,
    pub determination: f64,
}

/// Floor `x` to `digits` decimal places
pub fn flp(x: f64, digits: i32) -> f64 {
    let mult = 10f64.powi(digits);
    (x * mult).floor() / mult
}

/// Probability of a critical hit from the crit stat alone
pub fn critical_hit_rate(level: LevelSync, crit: f64) -> f64 {
    let sub = level.sub_stat_base();
    let div = level.stat_divisor();
    ((200.0 * (crit - sub) / div).floor() + 50.0) * 0.001
}

/// Damage multiplier of a critical hit
pub fn critical_hit_strength(level: LevelSync, crit: f64) -> f64 {
    let sub = level.sub_stat_base();
    let div = level.stat_divisor();
    ((200.0 * (crit - sub) / div).floor() + 1400.0) * 0.001
}

/// Probability of a direct hit
pub fn direct_hit_rate(level: LevelSync, dh: f64) -> f64 {
    let sub = level.sub_stat_base();
    let div = level.stat_divisor();
    (550.0 * (dh - sub) / div).floor() * 0.001
}

/// Extra damage a guaranteed direct hit gets from the direct hit stat
pub fn auto_direct_hit_bonus(level: LevelSync, dh: f64) -> f64 {
    let sub = level.sub_stat_base();
    let div = level.stat_divisor();
    (140.0 * (dh - sub) / div).floor() * 0.001
}

/// Determination multiplier (based on the main stat, not the sub stat)
pub fn determination_multiplier(level: LevelSync, det: f64) -> f64 {
    let base = level.main_stat_base();
    let div = level.stat_divisor();
    (1000.0 + 140.0 * (det - base) / div).floor() * 0.001
}

/// Expected damage multiplier over the four crit/direct-hit outcomes
///
/// A bonus of 1 or more on either rate means the outcome is guaranteed;
/// anything above 1 is converted into extra damage on that outcome instead
/// of extra probability. Negative bonuses disable the outcome entirely.
pub fn calculate_damage(stats: &CombatStats, damage_factor: f64, crit_bonus: f64, dh_bonus: f64) -> f64 {
    let level = stats.level;
    let mut modifier = damage_factor;

    let crit_rate = if crit_bonus >= 1.0 {
        crit_bonus
    } else if crit_bonus < 0.0 {
        0.0
    } else {
        critical_hit_rate(level, stats.critical_hit) + crit_bonus
    };
    let dh_rate = if dh_bonus >= 1.0 {
        dh_bonus
    } else if dh_bonus < 0.0 {
        0.0
    } else {
        direct_hit_rate(level, stats.direct_hit) + dh_bonus
    };

    if crit_rate == 0.0 && dh_rate == 0.0 {
        return modifier;
    }

    let crit_damage_mult = critical_hit_strength(level, stats.critical_hit);
    let auto_cdh = crit_rate >= 1.0 && dh_rate >= 1.0;
    let crit_mod = if crit_rate > 1.0 {
        flp(1.0 + (crit_damage_mult - 1.0) * (crit_bonus - 1.0), 3)
    } else {
        1.0
    };
    let dh_mod = if dh_rate > 1.0 {
        flp(1.0 + (DIRECT_HIT_MULTIPLIER - 1.0) * (dh_bonus - 1.0), 3)
    } else {
        1.0
    };
    let clamped_crit = crit_rate.min(1.0);
    let clamped_dh = dh_rate.min(1.0);

    if auto_cdh {
        modifier *= flp(
            determination_multiplier(level, stats.determination)
                + auto_direct_hit_bonus(level, stats.direct_hit),
            3,
        );
    } else {
        modifier *= determination_multiplier(level, stats.determination);
    }

    let crit_damage = modifier * crit_mod * crit_damage_mult;
    let dh_damage = modifier * dh_mod * DIRECT_HIT_MULTIPLIER;
    let crit_dh_damage = crit_damage * dh_mod * DIRECT_HIT_MULTIPLIER;
    let crit_dh_rate = clamped_crit * clamped_dh;
    let normal_rate = 1.0 - clamped_crit - clamped_dh + crit_dh_rate;

    modifier * normal_rate
        + crit_damage * (clamped_crit - crit_dh_rate)
        + dh_damage * (clamped_dh - crit_dh_rate)
        + crit_dh_damage * crit_dh_rate
}

/// Potency of one damage-over-time tick after speed scaling
pub fn overtime_potency(level: LevelSync, speed: f64, base_potency: f64) -> f64 {
    let sub = level.sub_stat_base();
    let div = level.stat_divisor();
    let strength = (1000.0 + ((speed - sub) * 130.0 / div).floor()) * 0.001;
    base_potency * strength
}

/// Recast of a GCD before any per-cast tax
///
/// `speed_modifier` is an integer percentage reduction (15 for a 15% haste).
pub fn pre_tax_gcd(level: LevelSync, speed: f64, base_gcd: f64, speed_modifier: u32) -> f64 {
    let sub = level.sub_stat_base();
    let div = level.stat_divisor();
    let ceil = ((sub - speed) * 130.0 / div).ceil();
    let pts = (base_gcd * (1000.0 + ceil)).floor();
    ((100.0 - speed_modifier as f64) * pts / 1000.0).floor() / 100.0
}

/// Cast time before any per-cast tax
pub fn pre_tax_cast_time(level: LevelSync, speed: f64, base_cast_time: f64, speed_modifier: u32) -> f64 {
    let sub = level.sub_stat_base();
    let div = level.stat_divisor();
    let haste = ((100.0 - speed_modifier as f64) * 100.0 / 100.0).floor();
    let speed_pts =
        ((2000.0 - (130.0 * (speed - sub) / div + 1000.0).floor()) * (1000.0 * base_cast_time) / 1000.0)
            .floor();
    ((haste * speed_pts / 100.0).floor() * 100.0 / 100.0).floor() / 1000.0
}
