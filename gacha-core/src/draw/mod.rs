//! Draw engine.
//!
//! One draw = one rarity roll against the weight table, then a uniform pick
//! among the catalog items of that tier. The engine holds no collection
//! state; committing results is the caller's job (see [`machine`]).

use std::sync::Arc;
use tracing::debug;

use crate::catalog::{Catalog, Item, RarityTier, RarityWeights};
use crate::constants::WEIGHT_TOTAL;
use crate::error::{GachaError, GachaResult};

pub mod machine;
pub mod rng;

pub use rng::UniformSource;

#[derive(Debug, Clone)]
pub struct DrawEngine {
    catalog: Arc<Catalog>,
    weights: RarityWeights,
}

impl DrawEngine {
    /// Fails if the weight table does not sum to 100
    pub fn new(catalog: Arc<Catalog>, weights: RarityWeights) -> GachaResult<Self> {
        weights.validate()?;
        Ok(Self { catalog, weights })
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn weights(&self) -> &RarityWeights {
        &self.weights
    }

    /// Roll a tier: `r = u * 100`, walked rarest-first
    pub fn select_tier<R: UniformSource + ?Sized>(&self, rng: &mut R) -> RarityTier {
        let roll = rng.next_uniform() * f64::from(WEIGHT_TOTAL);
        self.weights
            .tier_for_roll(roll)
            .unwrap_or(RarityTier::Common)
    }

    /// Uniform pick within one tier
    pub fn pick_in_tier<R: UniformSource + ?Sized>(
        &self,
        tier: RarityTier,
        rng: &mut R,
    ) -> GachaResult<&Item> {
        let candidates = self.catalog.in_tier(tier);
        if candidates.is_empty() {
            return Err(GachaError::EmptyTier(tier));
        }
        let idx = (rng.next_uniform() * candidates.len() as f64) as usize;
        Ok(candidates[idx.min(candidates.len() - 1)])
    }

    /// Full draw: tier roll followed by item pick
    pub fn draw<R: UniformSource + ?Sized>(&self, rng: &mut R) -> GachaResult<Item> {
        let tier = self.select_tier(rng);
        let item = self.pick_in_tier(tier, rng)?;
        debug!(tier = %tier, item_id = item.id, "draw");
        Ok(item.clone())
    }
}
