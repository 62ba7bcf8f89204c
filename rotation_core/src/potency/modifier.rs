//! Potency modifiers - buffs and bonuses folded into a potency at snapshot

use serde::{Deserialize, Serialize};

/// How a modifier changes a potency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModifierKind {
    /// Multiplies the potency (e.g. a 10% damage buff is 1.1)
    Multiplier { factor: f64 },
    /// Added to the base potency before any multiplier
    Adder { amount: f64 },
    /// Flat bonus to crit and direct hit rates
    CritDirect { crit_bonus: f64, dh_bonus: f64 },
    /// The hit is a guaranteed critical hit
    AutoCrit,
    /// The hit is a guaranteed critical direct hit
    AutoCritDirect,
    /// The hit can neither crit nor direct hit
    NoCritDirect,
    /// Marks a potency taken under a tincture; scaled by the session setting
    Tincture,
}

/// A modifier tagged with the buff it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotencyModifier {
    pub source: String,
    #[serde(flatten)]
    pub kind: ModifierKind,
}

impl PotencyModifier {
    pub fn new(source: impl Into<String>, kind: ModifierKind) -> Self {
        PotencyModifier {
            source: source.into(),
            kind,
        }
    }

    /// Plain multiplicative modifier
    pub fn multiplier(source: impl Into<String>, factor: f64) -> Self {
        Self::new(source, ModifierKind::Multiplier { factor })
    }
}

/// Potency after adders and multipliers, ignoring crit and direct hit
///
/// Adders apply to the base first; every multiplier then scales the sum.
pub fn compute_potency(base: f64, modifiers: &[PotencyModifier]) -> f64 {
    let mut additive = 0.0;
    let mut factor = 1.0;
    for m in modifiers {
        match m.kind {
            ModifierKind::Multiplier { factor: f } => factor *= f,
            ModifierKind::Adder { amount } => additive += amount,
            _ => {}
        }
    }
    (base + additive) * factor
}
