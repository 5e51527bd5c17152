//! finsynth CLI: generate a synthetic financial-institution dataset into both stores

use anyhow::{bail, Context};
use clap::Parser;
use comfy_table::{ContentArrangement, Table};
use finsynth::config::load_env_file;
use finsynth::{Config, DatasetPipeline, EntityKind, GraphBackendKind, RunOptions, RunReport};
use std::path::PathBuf;
use tracing::{info, Level};

const DEFAULT_ENV_FILE: &str = "config/.env";

/// Failed items listed in the table report before truncating
const MAX_LISTED_FAILURES: usize = 20;

#[derive(Parser)]
#[command(name = "finsynth", version, about = "Synthetic financial-institution dataset generator")]
struct Cli {
    /// Number of institutions to generate
    #[arg(long)]
    num_institutions: Option<usize>,

    /// Minimum transactions per account
    #[arg(long)]
    min_transactions: Option<usize>,

    /// Maximum transactions per account
    #[arg(long)]
    max_transactions: Option<usize>,

    /// Wipe both stores and exit without generating
    #[arg(long)]
    cleanup_only: bool,

    /// Env file with store credentials
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for a reproducible dataset
    #[arg(long)]
    seed: Option<u64>,

    /// Relational store URL, e.g. sqlite://finsynth.db?mode=rwc
    #[arg(long)]
    database_url: Option<String>,

    /// Graph backend: embedded or neo4j
    #[arg(long)]
    graph_backend: Option<String>,

    /// Snapshot file for the embedded graph
    #[arg(long)]
    graph_snapshot: Option<PathBuf>,

    /// Records per store call
    #[arg(long)]
    batch_size: Option<usize>,

    /// Also write every kind as CSV into this directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Keep existing data instead of wiping both stores first
    #[arg(long)]
    no_wipe: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

/// Returns `Ok(false)` when a store failed fatally during the run
async fn run(cli: Cli) -> anyhow::Result<bool> {
    match &cli.env_file {
        Some(path) => {
            if !load_env_file(path)? {
                bail!("env file {} not found", path.display());
            }
        }
        None => {
            load_env_file(DEFAULT_ENV_FILE)?;
        }
    }

    let config = build_config(&cli)?;
    let pipeline = DatasetPipeline::connect(config)
        .await
        .context("failed to open stores")?;

    if cli.cleanup_only {
        pipeline.cleanup().await?;
        info!("Cleanup only, nothing generated");
        return Ok(true);
    }

    let options = RunOptions {
        wipe_first: !cli.no_wipe,
        output_dir: cli.output_dir.clone(),
    };
    let report = pipeline.run(&options).await?;

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print_report(&report);
    }
    Ok(!report.is_fatal())
}

/// Defaults, then YAML, then environment, then flags
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_yaml_file(path)?,
        None => Config::default(),
    };
    config.apply_process_env()?;

    if let Some(n) = cli.num_institutions {
        config.generator.num_institutions = n;
    }
    if let Some(n) = cli.min_transactions {
        config.generator.transactions_per_account.min = n;
    }
    if let Some(n) = cli.max_transactions {
        config.generator.transactions_per_account.max = n;
    }
    if let Some(seed) = cli.seed {
        config.generator.seed = Some(seed);
    }
    if let Some(url) = &cli.database_url {
        config.store.database_url = url.clone();
    }
    if let Some(backend) = &cli.graph_backend {
        config.store.graph_backend = backend.parse::<GraphBackendKind>()?;
    }
    if let Some(path) = &cli.graph_snapshot {
        config.store.graph_snapshot = Some(path.clone());
    }
    if let Some(size) = cli.batch_size {
        config.batch.default_size = size;
    }
    Ok(config)
}

fn print_report(report: &RunReport) {
    let stores = report.stores();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    let mut header = vec!["kind".to_string(), "generated".to_string()];
    header.extend(stores.iter().map(|s| format!("{} ok/failed/skipped", s)));
    table.set_header(header);

    for kind in EntityKind::WRITE_ORDER {
        let generated = report.generated.get(&kind).copied().unwrap_or(0);
        if generated == 0 && !report.kinds.contains_key(&kind) {
            continue;
        }
        let mut row = vec![kind.to_string(), generated.to_string()];
        for store in &stores {
            let tally = report.tally(kind, store);
            row.push(format!("{}/{}/{}", tally.succeeded, tally.failed, tally.skipped));
        }
        table.add_row(row);
    }
    println!("{}", table);

    if !report.failed_items.is_empty() {
        let mut failures = Table::new();
        failures.set_content_arrangement(ContentArrangement::Dynamic);
        failures.set_header(vec!["store", "kind", "record", "reason"]);
        for item in report.failed_items.iter().take(MAX_LISTED_FAILURES) {
            failures.add_row(vec![
                item.store.clone(),
                item.kind.to_string(),
                item.record_id.to_string(),
                item.reason.clone(),
            ]);
        }
        println!("{}", failures);
        if report.failed_items.len() > MAX_LISTED_FAILURES {
            println!(
                "... and {} more failed item(s)",
                report.failed_items.len() - MAX_LISTED_FAILURES
            );
        }
    }

    if report.rejected_rounds > 0 {
        println!(
            "{} round(s) rejected by validation ({} record(s))",
            report.rejected_rounds,
            report.rejected.len()
        );
    }
    for (store, reason) in &report.fatal {
        println!("FATAL {}: {}", store, reason);
    }
}
