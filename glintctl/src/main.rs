//! Command-line driver for the glint image loader.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glint_config::{LoaderSettings, SettingsSource, load_manifest};
use glint_core::{
    ContentKey, Fetcher, KeyStrategy, LoadCoordinator, ResourceRecord,
    SlotBinding, SlotId,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "glintctl",
    about = "Drive the glint image loader from a manifest"
)]
struct Cli {
    /// Settings file (overrides GLINT_CONFIG_PATH)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Cache directory (overrides settings and GLINT_CACHE_DIR)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the records in a manifest with their cache keys
    List {
        #[arg(long, default_value = "mask.json")]
        manifest: PathBuf,
    },
    /// Print the cache key derived for a URL
    Key {
        url: String,
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
    },
    /// Fetch every record in a manifest into the cache
    Fetch {
        #[arg(long, default_value = "mask.json")]
        manifest: PathBuf,
    },
    /// Simulate a scrolling list: bind slots, recycle them, report deliveries
    Bind {
        #[arg(long, default_value = "mask.json")]
        manifest: PathBuf,
        /// Number of visible slots
        #[arg(long, default_value_t = 4)]
        slots: usize,
        /// How many times each slot is recycled before results are awaited
        #[arg(long, default_value_t = 1)]
        passes: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    LastSegment,
    Sha256,
}

impl From<StrategyArg> for KeyStrategy {
    fn from(val: StrategyArg) -> Self {
        match val {
            StrategyArg::LastSegment => KeyStrategy::LastSegment,
            StrategyArg::Sha256 => KeyStrategy::Sha256,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;

    match cli.command {
        Command::List { manifest } => {
            list(&settings, &load_manifest(&manifest))
        }
        Command::Key { url, strategy } => {
            let strategy = strategy
                .map(KeyStrategy::from)
                .unwrap_or(settings.key_strategy);
            let key = ContentKey::derive(&url, strategy).with_context(|| {
                format!("cannot derive a cache key for {url}")
            })?;
            println!("{key}");
            Ok(())
        }
        Command::Fetch { manifest } => {
            let fetcher = Arc::new(settings.fetcher()?);
            fetch_all(fetcher, load_manifest(&manifest)).await
        }
        Command::Bind {
            manifest,
            slots,
            passes,
        } => {
            let fetcher = Arc::new(settings.fetcher()?);
            let records = load_manifest(&manifest);
            simulate_scroll(fetcher, &records, slots, passes).await
        }
    }
}

fn resolve_settings(cli: &Cli) -> Result<LoaderSettings> {
    let (mut settings, source) = match &cli.config {
        Some(path) => {
            let mut settings = LoaderSettings::load_from_file(path)?;
            settings.apply_overrides(|var| std::env::var(var).ok())?;
            (settings, SettingsSource::File(path.clone()))
        }
        None => LoaderSettings::load_from_env()?,
    };
    if let Some(dir) = &cli.cache_dir {
        settings.cache_dir = dir.clone();
    }
    tracing::debug!(
        ?source,
        cache_dir = %settings.cache_dir.display(),
        "settings resolved"
    );
    Ok(settings)
}

fn list(settings: &LoaderSettings, records: &[ResourceRecord]) -> Result<()> {
    println!("{} records", records.len());
    for (row, record) in records.iter().enumerate() {
        let key = ContentKey::derive(&record.identity, settings.key_strategy)
            .map(|k| k.to_string())
            .unwrap_or_else(|_| "<invalid>".to_string());
        println!(
            "{row}\t{}\t{}\t{key}",
            record.display_label, record.identity
        );
    }
    Ok(())
}

async fn fetch_all(
    fetcher: Arc<Fetcher>,
    records: Vec<ResourceRecord>,
) -> Result<()> {
    let mut tasks = Vec::with_capacity(records.len());
    for record in records {
        let fetcher = Arc::clone(&fetcher);
        tasks.push(tokio::spawn(async move {
            let result = fetcher.fetch_image(&record.identity).await;
            (record, result)
        }));
    }

    let mut failed = 0usize;
    for task in tasks {
        let (record, result) = task.await.context("fetch task panicked")?;
        match result {
            Ok(image) => {
                let (w, h) = image.dimensions();
                println!(
                    "ok\t{}\t{}\t{w}x{h}",
                    record.display_label, image.key
                );
            }
            Err(err) => {
                failed += 1;
                println!(
                    "failed\t{}\t{}\t{err}",
                    record.display_label, record.identity
                );
            }
        }
    }

    let stats = fetcher.stats();
    println!(
        "cache hits: {}, transfers: {}, failures: {}",
        stats.cache_hits, stats.transfers, stats.failures
    );
    if failed > 0 {
        tracing::warn!(failed, "some images could not be loaded");
    }
    Ok(())
}

type Delivered = (SlotId, String, Option<(u32, u32)>);

async fn simulate_scroll(
    fetcher: Arc<Fetcher>,
    records: &[ResourceRecord],
    slot_count: usize,
    passes: usize,
) -> Result<()> {
    if records.is_empty() || slot_count == 0 {
        println!("nothing to bind");
        return Ok(());
    }

    let mut binding =
        SlotBinding::new(LoadCoordinator::with_current_runtime(fetcher)?);
    let delivered: Rc<RefCell<Vec<Delivered>>> = Rc::default();

    // Every pass recycles each slot onto the next page of records without
    // waiting, the way a fast fling reuses rows.
    for pass in 0..=passes {
        for slot in 0..slot_count {
            let row = (pass * slot_count + slot) % records.len();
            let record = &records[row];
            let sink = Rc::clone(&delivered);
            let label = record.display_label.clone();
            binding.bind(slot, record, move |image| {
                sink.borrow_mut()
                    .push((slot, label, image.map(|i| i.dimensions())));
            });
        }
    }

    let count = binding.settle().await;
    let mut delivered = delivered.take();
    delivered.sort_by_key(|(slot, _, _)| *slot);
    for (slot, label, dims) in delivered {
        match dims {
            Some((w, h)) => println!("slot {slot}\t{label}\t{w}x{h}"),
            None => println!("slot {slot}\t{label}\t<none>"),
        }
    }
    println!("{count} deliveries for {slot_count} slots");
    Ok(())
}
