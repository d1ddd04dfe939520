/// Interactive-style gacha session against file-backed storage
///
/// Usage: cargo run --bin session -- --dir .gacha --pulls 10 --delay-ms 2000
///        [--seed 42] [--config gacha.json] [--reset-marker] [--clear]
///
/// Each pull spins the machine, waits out the spin delay, then prints the
/// reveal. The collection survives between runs in `--dir`.
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

use gacha_core::catalog::Item;
use gacha_core::collection::{CollectionProgress, CollectionStore, FileStorage, GroupedEntry};
use gacha_core::config::GachaConfig;
use gacha_core::draw::machine::{DrawReveal, GachaMachine, SpinRequest};
use gacha_core::draw::rng::{EntropySource, SeededSource};
use gacha_core::draw::{DrawEngine, UniformSource};
use gacha_core::logging;

/// Clock tick while a spin is pending
const TICK_MS: u64 = 100;

#[derive(Debug, Serialize)]
struct SessionSummary {
    pulls: u64,
    revealed: Vec<Item>,
    progress: CollectionProgress,
    grouped: Vec<GroupedEntry>,
    celebrated: bool,
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => GachaConfig::load_file(&path).with_context(|| format!("loading {path}"))?,
        None => GachaConfig::default(),
    };
    if let Some(dir) = parse_str_arg(&args, "--dir") {
        config.storage_dir = PathBuf::from(dir);
    }
    if let Some(delay) = parse_arg(&args, "--delay-ms") {
        config.spin_delay_ms = delay;
    }
    if let Some(seed) = parse_arg(&args, "--seed") {
        config.seed = Some(seed);
    }
    let pulls = parse_arg(&args, "--pulls").unwrap_or(1);
    logging::init_tracing(&config.logging);

    let (catalog, weights) = config.load_catalog().context("loading catalog")?;
    let engine = DrawEngine::new(catalog.clone(), weights).context("building draw engine")?;
    let rng: Box<dyn UniformSource> = match config.seed {
        Some(seed) => Box::new(SeededSource::new(seed)),
        None => Box::new(EntropySource::new()),
    };
    let mut store = CollectionStore::open(
        catalog,
        FileStorage::new(&config.storage_dir),
        config.storage_keys(),
    );

    if has_flag(&args, "--clear") {
        store.clear_collection();
        println!("  Collection cleared");
    }
    if has_flag(&args, "--reset-marker") {
        store.reset_announcement_marker();
        println!("  Announcement marker reset");
    }

    println!("=== Gacha Session ===");
    println!("  Storage:  {}", config.storage_dir.display());
    println!("  Pulls:    {}", pulls);
    println!("  Delay:    {}ms", config.spin_delay_ms);
    print_progress(&store.progress());
    println!();

    let mut machine = GachaMachine::new(engine, rng, store)
        .context("building gacha machine")?
        .with_spin_delay(config.spin_delay_ms);
    let mut revealed = Vec::new();
    let mut celebrated = false;

    for pull in 1..=pulls {
        let reveal = spin_and_wait(&mut machine)?;
        let item = &reveal.item;
        println!(
            "  [{:>3}] {} {}{}",
            pull,
            item.rarity.label(),
            item.name,
            if reveal.outcome.new_item { "  NEW!" } else { "" }
        );
        if machine.store_mut().take_celebration() {
            celebrated = true;
            println!("\n  *** コンプリート！ 全{}種類を集めました！ ***\n", machine.store().catalog().len());
        }
        revealed.push(reveal.item);
    }

    let store = machine.into_store();
    println!("\n=== Collection ===");
    for entry in store.grouped_view() {
        println!(
            "  #{:<2} {:<6} {} x{}",
            entry.item.id,
            entry.item.rarity.label(),
            entry.item.name,
            entry.quantity
        );
    }
    print_progress(&store.progress());

    if let Some(path) = parse_str_arg(&args, "--out") {
        let summary = SessionSummary {
            pulls,
            revealed,
            progress: store.progress(),
            grouped: store.grouped_view().to_vec(),
            celebrated,
        };
        std::fs::write(&path, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("writing {path}"))?;
        println!("\n  Results written to {}", path);
    }

    println!("\nDone.");
    Ok(())
}

/// Spin, then drive the logical clock off wall time until the reveal
fn spin_and_wait<R: UniformSource>(
    machine: &mut GachaMachine<FileStorage, R>,
) -> Result<DrawReveal> {
    if let SpinRequest::Busy = machine.spin()? {
        anyhow::bail!("machine busy before spin");
    }
    let mut last = Instant::now();
    loop {
        if machine.remaining_ms().unwrap_or(0) > 0 {
            std::thread::sleep(Duration::from_millis(TICK_MS));
        }
        let elapsed = last.elapsed().as_millis() as u64;
        last = Instant::now();
        if let Some(reveal) = machine.advance(elapsed)? {
            info!(item_id = reveal.item.id, "pull complete");
            return Ok(reveal);
        }
    }
}

fn print_progress(progress: &CollectionProgress) {
    println!(
        "  Progress: {} 個獲得, {}/{} 種類{}",
        progress.total,
        progress.unique,
        progress.catalog_size,
        if progress.complete { " (complete)" } else { "" }
    );
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

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
