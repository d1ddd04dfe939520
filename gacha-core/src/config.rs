use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::{Catalog, CatalogDefinition, RarityWeights};
use crate::collection::StorageKeys;
use crate::constants::*;
use crate::error::{GachaError, GachaResult};
use crate::logging::TracingConfig;

/// Runtime configuration for a gacha session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GachaConfig {
    pub spin_delay_ms: u64,
    pub collection_key: String,
    pub announcement_key: String,
    pub storage_dir: PathBuf,
    /// Fixed seed for reproducible sessions; entropy when absent
    pub seed: Option<u64>,
    /// RON catalog definition; the built-in catalog when absent
    pub catalog_path: Option<PathBuf>,
    pub logging: TracingConfig,
}

impl Default for GachaConfig {
    fn default() -> Self {
        Self {
            spin_delay_ms: DEFAULT_SPIN_DELAY_MS,
            collection_key: COLLECTION_STORAGE_KEY.into(),
            announcement_key: ANNOUNCEMENT_STORAGE_KEY.into(),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            seed: None,
            catalog_path: None,
            logging: TracingConfig::default(),
        }
    }
}

impl GachaConfig {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> GachaResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| GachaError::Definition(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&source)
            .map_err(|e| GachaError::Definition(format!("{}: {}", path.display(), e)))
    }

    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys {
            collection: self.collection_key.clone(),
            announcement: self.announcement_key.clone(),
        }
    }

    /// Resolve the catalog and weight table this config points at
    pub fn load_catalog(&self) -> GachaResult<(Arc<Catalog>, RarityWeights)> {
        match &self.catalog_path {
            None => Ok((Arc::new(Catalog::default()), RarityWeights::default())),
            Some(path) => {
                let (catalog, weights) = CatalogDefinition::from_file(path)?.build()?;
                Ok((Arc::new(catalog), weights))
            }
        }
    }
}
