//! `dualstore` command line
//!
//! - `normalize`: rewrite the keys of JSON documents into storage-safe form
//! - `key`: normalize individual field names
//! - `route`: load a feature configuration and preview routing decisions
//! - `migrate`: bootstrap indexes and migrate a legacy directory into a
//!   target directory

mod file_store;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use dualstore_document::{normalize_key, transform, Document};
use dualstore_migration::{spawn_on_startup, MigrationEngine, MigrationSettings};
use dualstore_routing::{FeatureConfig, RoutingPolicy, SeededSource, Store};
use file_store::{FileLegacyStore, FileTargetStore};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dualstore", version, about = "Shadow routing and migration between two document stores")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize every key of a JSON document or array of documents
    Normalize {
        /// Input file; stdin when absent
        file: Option<PathBuf>,
    },
    /// Normalize field names
    Key {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Preview routing decisions for a configuration
    Route(RouteArgs),
    /// Migrate a legacy directory into a target directory
    Migrate(MigrateArgs),
}

#[derive(Args, Debug)]
struct RouteArgs {
    /// Properties or TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reads to simulate
    #[arg(long, default_value_t = 1000)]
    samples: u32,

    /// Seed for percentage draws
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Args, Debug)]
struct MigrateArgs {
    /// Legacy root: `<bucket>/<scope>/<collection>.json`
    #[arg(long)]
    legacy: PathBuf,

    /// Target root receiving `<collection>.jsonl`
    #[arg(long)]
    target: PathBuf,

    /// Feature configuration; `feature.migration.enabled` gates the run
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start immediately instead of waiting the grace period
    #[arg(long)]
    no_grace: bool,

    /// Documents per bulk insert
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Attempts per keyspace
    #[arg(long)]
    max_attempts: Option<u32>,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<FeatureConfig> {
    let config = match path {
        Some(path) => FeatureConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => FeatureConfig::new(),
    };
    let config = config.with_env_overrides().context("applying environment overrides")?;
    config.log_summary();
    Ok(config)
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).context("reading stdin")?;
            Ok(text)
        }
    }
}

fn normalize(file: Option<&PathBuf>) -> Result<()> {
    let input: serde_json::Value = serde_json::from_str(&read_input(file)?).context("parsing JSON input")?;
    let as_document = |value: serde_json::Value| {
        Document::from_json(value).context("expected a JSON object").map(|doc| transform(&doc).to_json())
    };

    let output = match input {
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items.into_iter().map(as_document).collect::<Result<Vec<_>>>()?,
        ),
        other => as_document(other)?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn route(args: &RouteArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let draws = SeededSource::new(args.seed);

    let (mut legacy, mut target) = (0_u32, 0_u32);
    for _ in 0..args.samples {
        match RoutingPolicy::route_read(&config, &draws) {
            Store::Legacy => legacy += 1,
            Store::Target => target += 1,
        }
    }

    let writes = RoutingPolicy::decide_write(&config);
    let summary = serde_json::json!({
        "config": config,
        "reads": {
            "samples": args.samples,
            "legacy": legacy,
            "target": target,
            "percentage_effective": config.shadow_percentage_effective(),
        },
        "writes": {
            "stores": writes.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            "primary": RoutingPolicy::primary_write(&config).as_str(),
            "shadow": writes.is_shadow(),
        },
        "validate": config.validate_consistency,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn migrate(args: MigrateArgs) -> Result<bool> {
    let config = match &args.config {
        Some(path) => load_config(Some(path))?,
        None => FeatureConfig::new().with_migration(true),
    };

    let mut settings = MigrationSettings::new();
    if args.no_grace {
        settings = settings.without_grace_period();
    }
    if let Some(size) = args.chunk_size {
        settings = settings.with_chunk_size(size);
    }
    if let Some(attempts) = args.max_attempts {
        settings = settings.with_max_attempts(attempts);
    }

    if !args.legacy.is_dir() {
        bail!("legacy directory {} does not exist", args.legacy.display());
    }

    let engine = MigrationEngine::new(
        Arc::new(FileLegacyStore::new(&args.legacy)),
        Arc::new(FileTargetStore::new(&args.target)),
    )
    .with_settings(settings);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling migration");
            on_signal.cancel();
        }
    });

    let Some(handle) = spawn_on_startup(&config, Arc::new(engine), cancel) else {
        info!("nothing to do");
        return Ok(true);
    };
    let report = handle.await.context("migration task failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.is_clean())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.cmd {
        Command::Normalize { file } => normalize(file.as_ref()),
        Command::Key { names } => {
            for name in names {
                println!("{name}\t{}", normalize_key(&name));
            }
            Ok(())
        }
        Command::Route(args) => route(&args),
        Command::Migrate(args) => {
            if !migrate(args).await? {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
