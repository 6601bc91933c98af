//! Feature buy tiers
//!
//! A purchase costs `cost_multiplier × bet`, skips the scatter trigger and
//! opens a free spin session carrying the tier's drum count.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SlotError};

/// Spins awarded by every purchase
pub const PURCHASE_FREE_SPINS: u32 = 7;

/// One purchasable tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseTier {
    pub label: String,
    /// Cost as a multiple of the current bet
    pub cost_multiplier: u64,
    pub drum_count: u8,
}

impl PurchaseTier {
    pub fn new(label: impl Into<String>, cost_multiplier: u64, drum_count: u8) -> Self {
        Self {
            label: label.into(),
            cost_multiplier,
            drum_count,
        }
    }

    /// 60×/1 drum, 80×/2 drums, 100×/3 drums
    pub fn standard_tiers() -> Vec<Self> {
        vec![
            Self::new("60x_1_drum", 60, 1),
            Self::new("80x_2_drums", 80, 2),
            Self::new("100x_3_drums", 100, 3),
        ]
    }

    pub fn cost(&self, bet: u64) -> u64 {
        bet.saturating_mul(self.cost_multiplier)
    }
}

/// Completed purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub tier: usize,
    pub cost: u64,
    pub drums: u8,
    pub free_spins: u32,
}

/// Validates and settles feature purchases
#[derive(Debug, Clone)]
pub struct FeatureBuyController {
    tiers: Vec<PurchaseTier>,
    free_spins: u32,
}

impl FeatureBuyController {
    pub fn new(tiers: Vec<PurchaseTier>, max_drums: u8) -> Result<Self, ConfigError> {
        if tiers.len() < 3 {
            return Err(ConfigError::ValidationFailed(format!(
                "feature buy needs at least 3 tiers, got {}",
                tiers.len()
            )));
        }
        for tier in &tiers {
            if tier.cost_multiplier == 0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "tier '{}' has zero cost",
                    tier.label
                )));
            }
            if tier.drum_count == 0 || tier.drum_count > max_drums {
                return Err(ConfigError::ValidationFailed(format!(
                    "tier '{}' carries {} drums, allowed 1..={}",
                    tier.label, tier.drum_count, max_drums
                )));
            }
        }

        Ok(Self {
            tiers,
            free_spins: PURCHASE_FREE_SPINS,
        })
    }

    pub fn tiers(&self) -> &[PurchaseTier] {
        &self.tiers
    }

    pub fn tier(&self, index: usize) -> Result<&PurchaseTier, SlotError> {
        self.tiers
            .get(index)
            .ok_or(SlotError::InvalidTier { tier: index })
    }

    pub fn free_spins(&self) -> u32 {
        self.free_spins
    }

    pub fn cost(&self, tier: usize, bet: u64) -> Result<u64, SlotError> {
        Ok(self.tier(tier)?.cost(bet))
    }

    /// Check a purchase without touching credit; returns the cost
    pub fn validate_purchase(&self, tier: usize, bet: u64, credit: u64) -> Result<u64, SlotError> {
        if bet == 0 {
            return Err(SlotError::InvalidBet { bet });
        }
        let required = self.cost(tier, bet)?;
        if credit < required {
            return Err(SlotError::InsufficientCredit {
                required,
                available: credit,
            });
        }
        Ok(required)
    }

    /// Validate then deduct; `credit` is untouched on error
    pub fn execute_purchase(
        &self,
        tier: usize,
        bet: u64,
        credit: &mut u64,
    ) -> Result<PurchaseReceipt, SlotError> {
        let cost = self.validate_purchase(tier, bet, *credit)?;
        *credit -= cost;

        let receipt = PurchaseReceipt {
            tier,
            cost,
            drums: self.tiers[tier].drum_count,
            free_spins: self.free_spins,
        };
        log::info!(
            "Feature buy '{}': cost {}, {} drums",
            self.tiers[tier].label,
            cost,
            receipt.drums
        );
        Ok(receipt)
    }
}
