//! Resources and cooldowns - the countdown/stack containers behind every
//! gauge, buff, lock and recast timer

mod cooldown;
mod gauge;
mod state;

pub use cooldown::CoolDown;
pub use gauge::Resource;
pub use state::{CooldownState, ResourceState};

/// Names of the built-in resources every job carries
pub mod common {
    pub const MANA: &str = "mana";
    pub const IN_COMBAT: &str = "in_combat";
    pub const NOT_ANIMATION_LOCKED: &str = "not_animation_locked";
    pub const NOT_CASTER_TAXED: &str = "not_caster_taxed";
    pub const MOVEMENT: &str = "movement";
    /// The shared global cooldown
    pub const GCD: &str = "gcd";

    pub const MAX_MANA: f64 = 10000.0;

    /// Every built-in resource name (the GCD cooldown excluded)
    pub const RESOURCES: [&str; 5] = [
        MANA,
        IN_COMBAT,
        NOT_ANIMATION_LOCKED,
        NOT_CASTER_TAXED,
        MOVEMENT,
    ];
}
