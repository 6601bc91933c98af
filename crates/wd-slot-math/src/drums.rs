//! War drums bonus multiplier
//!
//! During free spins each active drum rolls one multiplier from a weighted
//! integer range; the drums' values are summed into the total multiplier
//! applied to the spin's base win. Draw weights fall off as `1 / m^exponent`,
//! so small multipliers dominate.
//!
//! Effect tags (`Shockwave`, `Gorgeous`) are cosmetic and come from the single
//! pure [`classify_effect`] function, shared by live rolls and by the offline
//! expectations below.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// War drums configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarDrumsConfig {
    /// Inclusive multiplier range per drum
    pub multiplier_range: (u32, u32),
    /// Weight of value `m` is `1 / m^weight_exponent`
    pub weight_exponent: f64,
    /// Most drums a session may carry
    pub max_drums: u8,
    /// Inclusive band tagged as shockwave
    pub shockwave_range: (u32, u32),
    /// Value tagged as gorgeous
    pub gorgeous_peak: u32,
}

impl Default for WarDrumsConfig {
    fn default() -> Self {
        Self {
            multiplier_range: (1, 10),
            weight_exponent: 1.5,
            max_drums: 3,
            shockwave_range: (5, 9),
            gorgeous_peak: 10,
        }
    }
}

impl WarDrumsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = self.multiplier_range;
        if min == 0 || min > max {
            return Err(ConfigError::ValidationFailed(format!(
                "drum multiplier range {min}..={max} must be non-empty and start at 1 or above"
            )));
        }
        if !self.weight_exponent.is_finite() || self.weight_exponent < 0.0 {
            return Err(ConfigError::ValidationFailed(format!(
                "drum weight exponent {} must be finite and non-negative",
                self.weight_exponent
            )));
        }
        Ok(())
    }

    /// Values a drum can land on
    pub fn multipliers(&self) -> std::ops::RangeInclusive<u32> {
        let (min, max) = self.multiplier_range;
        min..=max
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROLL RESULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Cosmetic drum effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrumEffect {
    Normal,
    Shockwave,
    Gorgeous,
}

/// Classify a rolled multiplier. Never affects payout.
pub fn classify_effect(multiplier: u32, config: &WarDrumsConfig) -> DrumEffect {
    let (low, high) = config.shockwave_range;
    if multiplier == config.gorgeous_peak {
        DrumEffect::Gorgeous
    } else if (low..=high).contains(&multiplier) {
        DrumEffect::Shockwave
    } else {
        DrumEffect::Normal
    }
}

/// One drum's roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrumRoll {
    /// 1-based drum index
    pub drum_id: u8,
    pub multiplier: u32,
    pub effect: DrumEffect,
}

/// All drum rolls for one free spin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrumOutcome {
    pub rolls: Vec<DrumRoll>,
    /// Sum of the rolls, never below 1
    pub total_multiplier: u32,
}

impl Default for DrumOutcome {
    fn default() -> Self {
        Self::skipped()
    }
}

impl DrumOutcome {
    /// No drums rolled
    pub fn skipped() -> Self {
        Self {
            rolls: Vec::new(),
            total_multiplier: 1,
        }
    }

    /// Build from already-drawn values
    pub fn from_multipliers(values: &[u32], config: &WarDrumsConfig) -> Self {
        let rolls: Vec<DrumRoll> = values
            .iter()
            .enumerate()
            .map(|(i, &multiplier)| DrumRoll {
                drum_id: i as u8 + 1,
                multiplier,
                effect: classify_effect(multiplier, config),
            })
            .collect();
        let total_multiplier = values
            .iter()
            .fold(0u32, |total, &m| total.saturating_add(m))
            .max(1);

        Self {
            rolls,
            total_multiplier,
        }
    }

    /// Rolls tagged shockwave or gorgeous
    pub fn special_effects(&self) -> impl Iterator<Item = &DrumRoll> {
        self.rolls.iter().filter(|r| r.effect != DrumEffect::Normal)
    }

    /// Final win for `base_win`
    pub fn apply(&self, base_win: u64) -> u64 {
        base_win.saturating_mul(self.total_multiplier as u64)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROLLER
// ═══════════════════════════════════════════════════════════════════════════════

/// Weighted drum roller
#[derive(Debug, Clone)]
pub struct WarDrums {
    config: WarDrumsConfig,
    values: Vec<u32>,
    weights: Vec<f64>,
    dist: WeightedIndex<f64>,
}

impl WarDrums {
    pub fn new(config: WarDrumsConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let values: Vec<u32> = config.multipliers().collect();
        let raw: Vec<f64> = values
            .iter()
            .map(|&m| 1.0 / (m as f64).powf(config.weight_exponent))
            .collect();
        let sum: f64 = raw.iter().sum();
        let weights: Vec<f64> = raw.iter().map(|w| w / sum).collect();

        let dist = WeightedIndex::new(&weights)
            .map_err(|e| ConfigError::ValidationFailed(format!("drum weights: {e}")))?;

        Ok(Self {
            config,
            values,
            weights,
            dist,
        })
    }

    pub fn config(&self) -> &WarDrumsConfig {
        &self.config
    }

    /// Roll `drum_count` drums. No win or no drums: no draws, multiplier 1.
    pub fn roll<R: Rng + ?Sized>(&self, drum_count: u8, had_win: bool, rng: &mut R) -> DrumOutcome {
        if drum_count == 0 || !had_win {
            return DrumOutcome::skipped();
        }

        let values: Vec<u32> = (0..drum_count)
            .map(|_| self.values[self.dist.sample(rng)])
            .collect();
        let outcome = DrumOutcome::from_multipliers(&values, &self.config);

        log::debug!("Drums {:?} -> x{}", values, outcome.total_multiplier);
        outcome
    }

    /// `(multiplier, probability)` pairs, ascending
    pub fn probabilities(&self) -> Vec<(u32, f64)> {
        self.values
            .iter()
            .copied()
            .zip(self.weights.iter().copied())
            .collect()
    }

    /// Expected value of a single drum
    pub fn expected_multiplier(&self) -> f64 {
        self.probabilities()
            .iter()
            .map(|&(m, p)| m as f64 * p)
            .sum()
    }

    /// Expected total multiplier on a winning free spin with `drum_count` drums
    pub fn expected_total_multiplier(&self, drum_count: u8) -> f64 {
        if drum_count == 0 {
            1.0
        } else {
            (self.expected_multiplier() * drum_count as f64).max(1.0)
        }
    }

    /// Probability of each effect class for a single drum
    pub fn effect_probabilities(&self) -> Vec<(DrumEffect, f64)> {
        let mut out = vec![
            (DrumEffect::Normal, 0.0),
            (DrumEffect::Shockwave, 0.0),
            (DrumEffect::Gorgeous, 0.0),
        ];
        for (m, p) in self.probabilities() {
            let effect = classify_effect(m, &self.config);
            if let Some(entry) = out.iter_mut().find(|(e, _)| *e == effect) {
                entry.1 += p;
            }
        }
        out
    }
}
