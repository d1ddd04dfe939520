//! Gacha machine: spin, wait, reveal.
//!
//! A spin draws immediately but the result is only committed to the
//! collection once the spin delay has elapsed on the logical clock. At most
//! one draw is pending; spinning again while pending is a no-op.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{DrawEngine, UniformSource};
use crate::catalog::Item;
use crate::collection::{CollectionStore, KeyValueStore, RecordOutcome};
use crate::constants::DEFAULT_SPIN_DELAY_MS;
use crate::error::{GachaError, GachaResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpinRequest {
    Started { remaining_ms: u64 },
    /// A draw is already pending
    Busy,
}

/// A committed draw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawReveal {
    pub item: Item,
    pub outcome: RecordOutcome,
}

#[derive(Debug, Clone)]
struct PendingDraw {
    item: Item,
    remaining_ms: u64,
}

pub struct GachaMachine<S: KeyValueStore, R: UniformSource> {
    engine: DrawEngine,
    rng: R,
    store: CollectionStore<S>,
    spin_delay_ms: u64,
    pending: Option<PendingDraw>,
}

impl<S: KeyValueStore, R: UniformSource> GachaMachine<S, R> {
    /// Fails unless the engine draws from the catalog the store records
    pub fn new(engine: DrawEngine, rng: R, store: CollectionStore<S>) -> GachaResult<Self> {
        if engine.catalog().ids() != store.catalog().ids() {
            return Err(GachaError::CatalogMismatch);
        }
        Ok(Self {
            engine,
            rng,
            store,
            spin_delay_ms: DEFAULT_SPIN_DELAY_MS,
            pending: None,
        })
    }

    pub fn with_spin_delay(mut self, spin_delay_ms: u64) -> Self {
        self.spin_delay_ms = spin_delay_ms;
        self
    }

    pub fn spin_delay_ms(&self) -> u64 {
        self.spin_delay_ms
    }

    pub fn spin(&mut self) -> GachaResult<SpinRequest> {
        if self.pending.is_some() {
            debug!("spin ignored, draw pending");
            return Ok(SpinRequest::Busy);
        }
        let item = self.engine.draw(&mut self.rng)?;
        let remaining_ms = self.spin_delay_ms;
        self.pending = Some(PendingDraw { item, remaining_ms });
        Ok(SpinRequest::Started { remaining_ms })
    }

    /// Advance the clock; commits and returns the pending draw once its
    /// delay has run out
    pub fn advance(&mut self, elapsed_ms: u64) -> GachaResult<Option<DrawReveal>> {
        let due = match self.pending.as_mut() {
            None => return Ok(None),
            Some(pending) => {
                pending.remaining_ms = pending.remaining_ms.saturating_sub(elapsed_ms);
                pending.remaining_ms == 0
            }
        };
        if due {
            self.commit()
        } else {
            Ok(None)
        }
    }

    /// Commit the pending draw now, ignoring the remaining delay
    pub fn finish(&mut self) -> GachaResult<Option<DrawReveal>> {
        self.commit()
    }

    pub fn is_spinning(&self) -> bool {
        self.pending.is_some()
    }

    pub fn remaining_ms(&self) -> Option<u64> {
        self.pending.as_ref().map(|p| p.remaining_ms)
    }

    pub fn engine(&self) -> &DrawEngine {
        &self.engine
    }

    pub fn store(&self) -> &CollectionStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CollectionStore<S> {
        &mut self.store
    }

    pub fn into_store(self) -> CollectionStore<S> {
        self.store
    }

    fn commit(&mut self) -> GachaResult<Option<DrawReveal>> {
        let Some(pending) = self.pending.take() else {
            return Ok(None);
        };
        // A rejected record leaves the draw pending
        let outcome = match self.store.record(&pending.item) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.pending = Some(pending);
                return Err(e);
            }
        };
        info!(
            item_id = pending.item.id,
            rarity = %pending.item.rarity,
            total = outcome.total,
            unique = outcome.unique,
            "draw revealed"
        );
        Ok(Some(DrawReveal {
            item: pending.item,
            outcome,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, RarityTier, RarityWeights};
    use crate::collection::MemoryStorage;
    use crate::draw::rng::{SeededSource, SequenceSource};
    use std::sync::Arc;

    fn machine<R: UniformSource>(rng: R) -> GachaMachine<MemoryStorage, R> {
        let catalog = Arc::new(Catalog::default());
        let engine = DrawEngine::new(catalog.clone(), RarityWeights::default()).unwrap();
        let store = CollectionStore::new(catalog, MemoryStorage::new());
        GachaMachine::new(engine, rng, store).unwrap()
    }

    fn small_catalog() -> Arc<Catalog> {
        let items = [
            (11, RarityTier::Common),
            (12, RarityTier::Rare),
            (13, RarityTier::SuperRare),
            (14, RarityTier::UltraRare),
        ]
        .into_iter()
        .map(|(id, rarity)| Item {
            id,
            name: format!("item {id}"),
            description: String::new(),
            image: String::new(),
            rarity,
        })
        .collect();
        Arc::new(Catalog::new(items).unwrap())
    }

    #[test]
    fn test_mismatched_catalogs_rejected() {
        let engine =
            DrawEngine::new(Arc::new(Catalog::default()), RarityWeights::default()).unwrap();
        let store = CollectionStore::new(small_catalog(), MemoryStorage::new());
        let result = GachaMachine::new(engine, SeededSource::new(1), store);
        assert!(matches!(result, Err(GachaError::CatalogMismatch)));
    }

    #[test]
    fn test_failed_commit_keeps_draw_pending() {
        let engine =
            DrawEngine::new(Arc::new(Catalog::default()), RarityWeights::default()).unwrap();
        let store = CollectionStore::new(small_catalog(), MemoryStorage::new());
        // Built directly: the constructor refuses this pairing
        let mut m = GachaMachine {
            engine,
            rng: SequenceSource::new(vec![0.01, 0.0]),
            store,
            spin_delay_ms: 0,
            pending: None,
        };
        m.spin().unwrap();
        assert!(matches!(m.finish(), Err(GachaError::UnknownItem(7))));
        assert!(m.is_spinning());
        assert_eq!(m.store().total_count(), 0);
        assert_eq!(m.spin().unwrap(), SpinRequest::Busy);
    }

    #[test]
    fn test_spin_then_reveal_after_delay() {
        let mut m = machine(SequenceSource::new(vec![0.01, 0.0]));
        assert_eq!(
            m.spin().unwrap(),
            SpinRequest::Started { remaining_ms: 2000 }
        );
        assert!(m.is_spinning());
        assert!(m.advance(1500).unwrap().is_none());
        assert_eq!(m.remaining_ms(), Some(500));
        assert_eq!(m.store().total_count(), 0);

        let reveal = m.advance(500).unwrap().unwrap();
        assert_eq!(reveal.item.id, 7);
        assert_eq!(reveal.outcome.total, 1);
        assert!(!m.is_spinning());
        assert_eq!(m.store().total_count(), 1);
    }

    #[test]
    fn test_spin_while_pending_is_busy() {
        let mut m = machine(SeededSource::new(9));
        assert!(matches!(m.spin().unwrap(), SpinRequest::Started { .. }));
        assert_eq!(m.spin().unwrap(), SpinRequest::Busy);
        m.finish().unwrap();
        assert_eq!(m.store().total_count(), 1);
    }

    #[test]
    fn test_advance_without_pending_is_noop() {
        let mut m = machine(SeededSource::new(1));
        assert!(m.advance(10_000).unwrap().is_none());
        assert!(m.finish().unwrap().is_none());
    }

    #[test]
    fn test_zero_delay_commits_on_first_advance() {
        let mut m = machine(SeededSource::new(3)).with_spin_delay(0);
        m.spin().unwrap();
        assert!(m.advance(0).unwrap().is_some());
    }

    #[test]
    fn test_overshoot_commits_once() {
        let mut m = machine(SeededSource::new(5));
        m.spin().unwrap();
        assert!(m.advance(60_000).unwrap().is_some());
        assert!(m.advance(60_000).unwrap().is_none());
        assert_eq!(m.store().total_count(), 1);
    }

    #[test]
    fn test_many_spins_eventually_complete() {
        let mut m = machine(SeededSource::new(2024)).with_spin_delay(0);
        let mut announcements = 0;
        for _ in 0..2_000 {
            m.spin().unwrap();
            if let Some(reveal) = m.finish().unwrap() {
                if reveal.outcome.announced {
                    announcements += 1;
                }
            }
        }
        assert!(m.store().is_complete());
        assert_eq!(announcements, 1);
        assert!(m.store_mut().take_celebration());
    }
}
