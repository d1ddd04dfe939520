//! Error types for the gacha core.
//!
//! Configuration defects (bad catalog, bad weight table) are hard errors.
//! Storage problems are surfaced as [`StorageError`] but the collection store
//! only logs them: in-memory state stays authoritative for the session.

use crate::catalog::RarityTier;

/// Errors raised by key/value storage backends
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Storage quota exceeded while writing '{key}'")]
    QuotaExceeded { key: String },
}

/// Errors raised by the catalog, draw engine and collection store
#[derive(Debug, thiserror::Error)]
pub enum GachaError {
    #[error("Rarity tier '{0}' has no items in the catalog")]
    EmptyTier(RarityTier),
    #[error("Duplicate item id {0} in catalog")]
    DuplicateItemId(u32),
    #[error("Item ids must be positive (item '{name}' has id 0)")]
    InvalidItemId { name: String },
    #[error("Rarity weights must sum to 100, got {total}")]
    WeightSum { total: u64 },
    #[error("Item id {0} is not part of the catalog")]
    UnknownItem(u32),
    #[error("Draw engine and collection store use different catalogs")]
    CatalogMismatch,
    #[error("Simulation {field} of {value} exceeds limit {max}")]
    SimulationLimit {
        field: &'static str,
        value: u64,
        max: u64,
    },
    #[error("Catalog definition error: {0}")]
    Definition(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type GachaResult<T> = Result<T, GachaError>;
