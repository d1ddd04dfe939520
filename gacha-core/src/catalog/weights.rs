//! Rarity weight table.
//!
//! Integer percentages, one per tier, summing to exactly 100. The table is
//! walked rarest-first so that a roll equal to a cumulative threshold lands in
//! the next more common tier.

use serde::{Deserialize, Serialize};

use super::RarityTier;
use crate::constants::WEIGHT_TOTAL;
use crate::error::{GachaError, GachaResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RarityWeights {
    pub common: u32,
    pub rare: u32,
    pub super_rare: u32,
    pub ultra_rare: u32,
}

impl Default for RarityWeights {
    fn default() -> Self {
        Self {
            common: 60,
            rare: 25,
            super_rare: 10,
            ultra_rare: 5,
        }
    }
}

impl RarityWeights {
    pub fn weight(&self, tier: RarityTier) -> u32 {
        match tier {
            RarityTier::Common => self.common,
            RarityTier::Rare => self.rare,
            RarityTier::SuperRare => self.super_rare,
            RarityTier::UltraRare => self.ultra_rare,
        }
    }

    /// Sum of all weights, widened so oversized tables cannot wrap
    pub fn total(&self) -> u64 {
        RarityTier::ALL
            .iter()
            .map(|t| u64::from(self.weight(*t)))
            .sum()
    }

    pub fn validate(&self) -> GachaResult<()> {
        let total = self.total();
        if total != u64::from(WEIGHT_TOTAL) {
            return Err(GachaError::WeightSum { total });
        }
        Ok(())
    }

    /// Declared probability of a tier (0.0 - 1.0)
    pub fn share(&self, tier: RarityTier) -> f64 {
        f64::from(self.weight(tier)) / f64::from(WEIGHT_TOTAL)
    }

    /// Map a roll in `[0, 100)` to a tier.
    ///
    /// Ultra-rare is checked first, then super-rare, then rare; anything left
    /// is common. Rolls outside the range yield `None`.
    pub fn tier_for_roll(&self, roll: f64) -> Option<RarityTier> {
        if !(0.0..f64::from(WEIGHT_TOTAL)).contains(&roll) {
            return None;
        }

        let mut threshold = 0.0;
        for tier in RarityTier::RAREST_FIRST {
            threshold += f64::from(self.weight(tier));
            if roll < threshold {
                return Some(tier);
            }
        }
        Some(RarityTier::Common)
    }
}
