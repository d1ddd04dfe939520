//! Collection store.
//!
//! Owns the append-only list of drawn items, persists it after every
//! `record`, and keeps the derived views (grouped entries, counts,
//! completion) in step with it. Storage failures are logged and never undo
//! in-memory state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::{Catalog, Item};
use crate::constants::{ANNOUNCEMENT_STORAGE_KEY, COLLECTION_STORAGE_KEY};
use crate::error::{GachaError, GachaResult, StorageError};

pub mod latch;
pub mod storage;

pub use latch::{AnnouncementLatch, AnnouncementState};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};

/// Keys under which the store persists its state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
    pub collection: String,
    pub announcement: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            collection: COLLECTION_STORAGE_KEY.to_string(),
            announcement: ANNOUNCEMENT_STORAGE_KEY.to_string(),
        }
    }
}

/// One distinct item with how many times it was drawn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedEntry {
    #[serde(flatten)]
    pub item: Item,
    pub quantity: u32,
}

/// Counters shown next to the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionProgress {
    pub total: usize,
    pub unique: usize,
    pub catalog_size: usize,
    pub complete: bool,
}

/// What a single `record` changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub total: usize,
    pub unique: usize,
    /// First copy of this item
    pub new_item: bool,
    pub complete: bool,
    /// The completion announcement fired on this record
    pub announced: bool,
    pub persisted: bool,
}

/// Result of reading persisted state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub restored: usize,
    /// Stored entries whose id is no longer in the catalog
    pub discarded: usize,
    /// Stored collection was unreadable and was ignored
    pub corrupt: bool,
    pub announced: bool,
}

pub struct CollectionStore<S: KeyValueStore> {
    catalog: Arc<Catalog>,
    storage: S,
    keys: StorageKeys,
    entries: Vec<Item>,
    grouped: Vec<GroupedEntry>,
    latch: AnnouncementLatch,
}

impl<S: KeyValueStore> CollectionStore<S> {
    /// Empty store; call [`load`](Self::load) to read persisted state
    pub fn new(catalog: Arc<Catalog>, storage: S) -> Self {
        Self::with_keys(catalog, storage, StorageKeys::default())
    }

    pub fn with_keys(catalog: Arc<Catalog>, storage: S, keys: StorageKeys) -> Self {
        Self {
            catalog,
            storage,
            keys,
            entries: Vec::new(),
            grouped: Vec::new(),
            latch: AnnouncementLatch::default(),
        }
    }

    /// Construct and load in one step
    pub fn open(catalog: Arc<Catalog>, storage: S, keys: StorageKeys) -> Self {
        let mut store = Self::with_keys(catalog, storage, keys);
        store.load();
        store
    }

    /// Replace in-memory state with what storage holds.
    ///
    /// Unreadable data means "nothing stored"; this never fails.
    pub fn load(&mut self) -> LoadReport {
        let mut report = LoadReport::default();

        let stored: Vec<Item> = match self.storage.get(&self.keys.collection) {
            Ok(None) => Vec::new(),
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(items) => items,
                Err(e) => {
                    warn!(key = %self.keys.collection, error = %e, "stored collection is corrupt, starting empty");
                    report.corrupt = true;
                    Vec::new()
                }
            },
            // Non-UTF-8 bytes are damaged data, not a failed read
            Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                warn!(key = %self.keys.collection, error = %e, "stored collection is corrupt, starting empty");
                report.corrupt = true;
                Vec::new()
            }
            Err(e) => {
                warn!(key = %self.keys.collection, error = %e, "failed to read stored collection, starting empty");
                Vec::new()
            }
        };

        self.entries.clear();
        for item in stored {
            match self.catalog.get(item.id) {
                Some(current) => self.entries.push(current.clone()),
                None => report.discarded += 1,
            }
        }
        if report.discarded > 0 {
            warn!(discarded = report.discarded, "dropped stored items missing from catalog");
        }

        let marker = match self.storage.get(&self.keys.announcement) {
            Ok(marker) => marker,
            Err(e) => {
                warn!(key = %self.keys.announcement, error = %e, "failed to read announcement marker");
                None
            }
        };
        self.latch = AnnouncementLatch::from_marker(marker.as_deref());

        self.recompute();
        report.restored = self.entries.len();
        report.announced = self.latch.is_announced();
        info!(
            restored = report.restored,
            unique = self.unique_count(),
            announced = report.announced,
            "collection loaded"
        );
        report
    }

    /// Append a drawn item, persist, and run the completion check
    pub fn record(&mut self, item: &Item) -> GachaResult<RecordOutcome> {
        let current = self
            .catalog
            .get(item.id)
            .ok_or(GachaError::UnknownItem(item.id))?
            .clone();

        let new_item = self.quantity_of(current.id) == 0;
        self.entries.push(current);
        let persisted = self.persist_collection();
        self.recompute();

        let complete = self.is_complete();
        let announced = self.latch.check(complete);
        if announced {
            info!(total = self.total_count(), "collection complete, announcing");
            self.persist_marker();
        }

        Ok(RecordOutcome {
            total: self.total_count(),
            unique: self.unique_count(),
            new_item,
            complete,
            announced,
            persisted,
        })
    }

    /// Record by catalog id
    pub fn record_id(&mut self, id: u32) -> GachaResult<RecordOutcome> {
        let item = self
            .catalog
            .get(id)
            .ok_or(GachaError::UnknownItem(id))?
            .clone();
        self.record(&item)
    }

    /// Grouped entries, ascending by item id
    pub fn grouped_view(&self) -> &[GroupedEntry] {
        &self.grouped
    }

    pub fn unique_count(&self) -> usize {
        self.grouped.len()
    }

    pub fn total_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_complete(&self) -> bool {
        self.unique_count() == self.catalog.len()
    }

    pub fn quantity_of(&self, id: u32) -> u32 {
        self.grouped
            .iter()
            .find(|g| g.item.id == id)
            .map(|g| g.quantity)
            .unwrap_or(0)
    }

    pub fn progress(&self) -> CollectionProgress {
        CollectionProgress {
            total: self.total_count(),
            unique: self.unique_count(),
            catalog_size: self.catalog.len(),
            complete: self.is_complete(),
        }
    }

    /// Every draw in order
    pub fn entries(&self) -> &[Item] {
        &self.entries
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Catalog lookup for the item detail card
    pub fn find(&self, id: u32) -> Option<&Item> {
        self.catalog.get(id)
    }

    pub fn announcement_state(&self) -> AnnouncementState {
        self.latch.state()
    }

    pub fn celebration_pending(&self) -> bool {
        self.latch.celebration_pending()
    }

    /// One-shot: true exactly once after the announcement fires
    pub fn take_celebration(&mut self) -> bool {
        self.latch.take_celebration()
    }

    /// Administrative: forget that completion was announced
    pub fn reset_announcement_marker(&mut self) {
        self.latch.reset();
        if let Err(e) = self.storage.remove(&self.keys.announcement) {
            warn!(key = %self.keys.announcement, error = %e, "failed to remove announcement marker");
        }
        info!("announcement marker reset");
    }

    /// Administrative: drop every recorded draw. The announcement marker stays.
    pub fn clear_collection(&mut self) {
        self.entries.clear();
        self.recompute();
        if let Err(e) = self.storage.remove(&self.keys.collection) {
            warn!(key = %self.keys.collection, error = %e, "failed to remove stored collection");
        }
        info!("collection cleared");
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    fn recompute(&mut self) {
        let mut counts: BTreeMap<u32, (usize, u32)> = BTreeMap::new();
        for (idx, item) in self.entries.iter().enumerate() {
            counts.entry(item.id).or_insert((idx, 0)).1 += 1;
        }
        self.grouped = counts
            .into_values()
            .map(|(first, quantity)| GroupedEntry {
                item: self.entries[first].clone(),
                quantity,
            })
            .collect();
    }

    fn persist_collection(&mut self) -> bool {
        let json = match serde_json::to_string(&self.entries) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize collection");
                return false;
            }
        };
        match self.storage.set(&self.keys.collection, &json) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %self.keys.collection, error = %e, "failed to persist collection, keeping in-memory state");
                false
            }
        }
    }

    fn persist_marker(&mut self) {
        if let Err(e) = self.storage.set(&self.keys.announcement, latch::MARKER_VALUE) {
            warn!(key = %self.keys.announcement, error = %e, "failed to persist announcement marker");
        }
    }
}
