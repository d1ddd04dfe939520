/// Monte-Carlo check of the gacha odds
///
/// Usage: cargo run --bin draw_sim -- --draws 1000000 --trials 10000 --seed 42
///
/// Prints observed tier frequencies against the declared weights and the
/// number of draws a visitor needs to complete the collection.
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::info;

use gacha_core::catalog::RarityTier;
use gacha_core::config::GachaConfig;
use gacha_core::draw::DrawEngine;
use gacha_core::logging;
use gacha_core::simulation::{run_simulation, SimConfig};

/// Frequency drift above which the run is reported as failing
const MAX_DEVIATION: f64 = 0.01;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = match parse_str_arg(&args, "--config") {
        Some(path) => GachaConfig::load_file(&path).with_context(|| format!("loading {path}"))?,
        None => GachaConfig::default(),
    };
    logging::init_tracing(&config.logging);

    let defaults = SimConfig::default();
    let sim = SimConfig {
        draws: parse_arg(&args, "--draws").unwrap_or(defaults.draws),
        trials: parse_arg(&args, "--trials").unwrap_or(defaults.trials),
        base_seed: parse_arg(&args, "--seed")
            .or(config.seed)
            .unwrap_or(defaults.base_seed),
        max_draws_per_trial: parse_arg(&args, "--max-draws").unwrap_or(defaults.max_draws_per_trial),
    };

    let (catalog, weights) = config.load_catalog().context("loading catalog")?;
    let engine = DrawEngine::new(catalog, weights).context("building draw engine")?;

    println!("=== Gacha Draw Simulation ===");
    println!("  Draws:   {}", sim.draws);
    println!("  Trials:  {}", sim.trials);
    println!("  Seed:    {}", sim.base_seed);
    println!("  Catalog: {} items", engine.catalog().len());
    println!();

    let start = Instant::now();
    let report = run_simulation(&engine, &sim).context("running simulation")?;
    let elapsed = start.elapsed();
    info!(elapsed_ms = elapsed.as_millis() as u64, "simulation finished");

    println!("=== Tier Frequencies ===");
    println!("  {:<12} {:>10} {:>9} {:>9} {:>8}", "tier", "count", "observed", "expected", "drift");
    for tier in RarityTier::ALL {
        if let Some(freq) = report.distribution.frequency(tier) {
            println!(
                "  {:<12} {:>10} {:>8.3}% {:>8.3}% {:>7.3}%",
                tier.as_str(),
                freq.count,
                freq.observed * 100.0,
                freq.expected * 100.0,
                freq.deviation() * 100.0
            );
        }
    }

    let completion = &report.completion;
    println!("\n=== Draws To Complete ===");
    println!("  Completed: {}/{}", completion.completed, completion.trials);
    println!("  Average:   {:.1}", completion.avg_draws);
    println!("  Min:       {}", completion.min_draws);
    println!("  Median:    {}", completion.median_draws);
    println!("  P90:       {}", completion.p90_draws);
    println!("  Max:       {}", completion.max_draws);
    println!("\n  Duration:  {:.2}s", elapsed.as_secs_f64());

    if let Some(path) = parse_str_arg(&args, "--out") {
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing {path}"))?;
        println!("\n  Results written to {}", path);
    }

    let drift = report.distribution.max_deviation();
    if sim.draws >= 100_000 && drift > MAX_DEVIATION {
        println!("\n  WARNING: max tier drift {:.3}% exceeds {:.1}%", drift * 100.0, MAX_DEVIATION * 100.0);
        std::process::exit(1);
    }

    println!("\nDone.");
    Ok(())
}

fn parse_arg(args: &[String], flag: &str) -> Option<u64> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|val| val.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
