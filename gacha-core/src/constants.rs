//! Centralized constants for the gacha core.
//!
//! Storage keys match the ones the promo site has always written, so existing
//! visitor collections keep loading.

// =====================================================
// Persistence
// =====================================================

/// Storage key holding the serialized collection (JSON array of items)
pub const COLLECTION_STORAGE_KEY: &str = "kyohei-gacha-collection";

/// Storage key holding the completion-announcement marker
pub const ANNOUNCEMENT_STORAGE_KEY: &str = "kyohei-gacha-complete-announced";

/// Default directory for file-backed storage
pub const DEFAULT_STORAGE_DIR: &str = ".gacha";

// =====================================================
// Draw
// =====================================================

/// Rarity weights are integer percentages
pub const WEIGHT_TOTAL: u32 = 100;

/// Delay between a spin and its result being committed (ms)
pub const DEFAULT_SPIN_DELAY_MS: u64 = 2000;

// =====================================================
// Simulation
// =====================================================

/// Draws per rayon work unit in the distribution simulation
pub const SIM_CHUNK_DRAWS: u64 = 10_000;

/// Safety cap on draws in a single completion trial
pub const SIM_MAX_DRAWS_PER_TRIAL: u64 = 100_000;

/// Largest frequency-report draw count a host may request over the bridge
pub const SIM_MAX_DRAWS: u64 = 10_000_000;

/// Largest completion trial count a host may request over the bridge
pub const SIM_MAX_TRIALS: u64 = 100_000;

/// Core version reported over the bridge
pub const CORE_VERSION: &str = "0.1.0";
