//! Monte-Carlo draw simulation
//!
//! Checks that observed tier frequencies track the declared weights and
//! measures how many draws a visitor needs to complete the collection.
//! Work is split across CPU cores with rayon; every chunk or trial gets its
//! own seed derived from the base seed, so results are reproducible
//! regardless of thread scheduling.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::collections::HashSet;
use tracing::info;

use crate::catalog::RarityTier;
use crate::constants::{SIM_CHUNK_DRAWS, SIM_MAX_DRAWS, SIM_MAX_DRAWS_PER_TRIAL, SIM_MAX_TRIALS};
use crate::draw::rng::SeededSource;
use crate::draw::DrawEngine;
use crate::error::{GachaError, GachaResult};
use crate::logging::TimingSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Draws for the frequency report
    pub draws: u64,
    /// Independent draws-to-complete trials
    pub trials: u64,
    pub base_seed: u64,
    pub max_draws_per_trial: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            draws: 100_000,
            trials: 1_000,
            base_seed: 42,
            max_draws_per_trial: SIM_MAX_DRAWS_PER_TRIAL,
        }
    }
}

impl SimConfig {
    /// Reject runs larger than an untrusted caller may request
    pub fn check_limits(&self) -> GachaResult<()> {
        let limits = [
            ("draws", self.draws, SIM_MAX_DRAWS),
            ("trials", self.trials, SIM_MAX_TRIALS),
            ("max_draws_per_trial", self.max_draws_per_trial, SIM_MAX_DRAWS_PER_TRIAL),
        ];
        for (field, value, max) in limits {
            if value > max {
                return Err(GachaError::SimulationLimit { field, value, max });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierFrequency {
    pub tier: RarityTier,
    pub count: u64,
    pub observed: f64,
    pub expected: f64,
}

impl TierFrequency {
    pub fn deviation(&self) -> f64 {
        (self.observed - self.expected).abs()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionReport {
    pub total_draws: u64,
    /// Common first
    pub tiers: Vec<TierFrequency>,
}

impl DistributionReport {
    pub fn max_deviation(&self) -> f64 {
        self.tiers
            .iter()
            .map(TierFrequency::deviation)
            .fold(0.0, f64::max)
    }

    pub fn frequency(&self, tier: RarityTier) -> Option<&TierFrequency> {
        self.tiers.iter().find(|t| t.tier == tier)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub trials: u64,
    /// Trials that completed within the per-trial cap
    pub completed: u64,
    pub avg_draws: f64,
    pub min_draws: u64,
    pub max_draws: u64,
    pub median_draws: u64,
    pub p90_draws: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub distribution: DistributionReport,
    pub completion: CompletionReport,
}

/// Per-stream seed: first 8 bytes of SHA3-256(base_seed ‖ stream ‖ index)
pub fn derive_seed(base_seed: u64, stream: &str, index: u64) -> u64 {
    let mut hasher = Sha3_256::new();
    hasher.update(base_seed.to_le_bytes());
    hasher.update(stream.as_bytes());
    hasher.update(index.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Tier frequencies over `config.draws` draws
pub fn simulate_distribution(
    engine: &DrawEngine,
    config: &SimConfig,
) -> GachaResult<DistributionReport> {
    let _span = TimingSpan::new("simulate_distribution");
    let chunks = config.draws.div_ceil(SIM_CHUNK_DRAWS);

    let per_chunk: Vec<[u64; 4]> = (0..chunks)
        .into_par_iter()
        .map(|chunk| -> GachaResult<[u64; 4]> {
            let start = chunk * SIM_CHUNK_DRAWS;
            let n = SIM_CHUNK_DRAWS.min(config.draws - start);
            let mut rng = SeededSource::new(derive_seed(config.base_seed, "distribution", chunk));
            let mut counts = [0u64; 4];
            for _ in 0..n {
                let item = engine.draw(&mut rng)?;
                counts[item.rarity.id() as usize] += 1;
            }
            Ok(counts)
        })
        .collect::<GachaResult<Vec<_>>>()?;

    let mut totals = [0u64; 4];
    for counts in &per_chunk {
        for (total, count) in totals.iter_mut().zip(counts) {
            *total += count;
        }
    }

    let weights = engine.weights();
    let tiers = RarityTier::ALL
        .iter()
        .map(|&tier| {
            let count = totals[tier.id() as usize];
            TierFrequency {
                tier,
                count,
                observed: if config.draws == 0 {
                    0.0
                } else {
                    count as f64 / config.draws as f64
                },
                expected: weights.share(tier),
            }
        })
        .collect();

    let report = DistributionReport {
        total_draws: config.draws,
        tiers,
    };
    info!(
        draws = config.draws,
        max_deviation = report.max_deviation(),
        "distribution simulated"
    );
    Ok(report)
}

/// Draws needed to see every catalog item, over `config.trials` trials
pub fn simulate_completion(
    engine: &DrawEngine,
    config: &SimConfig,
) -> GachaResult<CompletionReport> {
    let _span = TimingSpan::new("simulate_completion");
    let target = engine.catalog().len();

    let results: Vec<Option<u64>> = (0..config.trials)
        .into_par_iter()
        .map(|trial| -> GachaResult<Option<u64>> {
            let mut rng = SeededSource::new(derive_seed(config.base_seed, "completion", trial));
            let mut seen = HashSet::with_capacity(target);
            for draws in 1..=config.max_draws_per_trial {
                seen.insert(engine.draw(&mut rng)?.id);
                if seen.len() == target {
                    return Ok(Some(draws));
                }
            }
            Ok(None)
        })
        .collect::<GachaResult<Vec<_>>>()?;

    let mut draws: Vec<u64> = results.into_iter().flatten().collect();
    draws.sort_unstable();

    let report = summarize_completion(config.trials, &draws);
    info!(
        trials = report.trials,
        completed = report.completed,
        avg_draws = report.avg_draws,
        "completion simulated"
    );
    Ok(report)
}

pub fn run_simulation(engine: &DrawEngine, config: &SimConfig) -> GachaResult<SimulationReport> {
    Ok(SimulationReport {
        distribution: simulate_distribution(engine, config)?,
        completion: simulate_completion(engine, config)?,
    })
}

/// `sorted` holds the draw counts of completed trials, ascending
fn summarize_completion(trials: u64, sorted: &[u64]) -> CompletionReport {
    if sorted.is_empty() {
        return CompletionReport {
            trials,
            completed: 0,
            avg_draws: 0.0,
            min_draws: 0,
            max_draws: 0,
            median_draws: 0,
            p90_draws: 0,
        };
    }
    let percentile = |p: f64| {
        let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    };
    CompletionReport {
        trials,
        completed: sorted.len() as u64,
        avg_draws: sorted.iter().sum::<u64>() as f64 / sorted.len() as f64,
        min_draws: sorted[0],
        max_draws: sorted[sorted.len() - 1],
        median_draws: percentile(0.5),
        p90_draws: percentile(0.9),
    }
}
