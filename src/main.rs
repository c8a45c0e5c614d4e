//! cohort-tables - manuscript summary tables for a longitudinal cohort study
//!
//! A CLI tool that collects per-run prediction results, aggregates them
//! across runs and writes the published performance tables.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any failure (missing input, malformed data, config, write error)

mod analysis;
mod cli;
mod config;
mod error;
mod frame;
mod models;
mod pipeline;
mod report;
mod supplement;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use pipeline::{RunOptions, RunSummary};
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        if let Err(e) = handle_init_config(&args) {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    // Initialize logging
    init_logging(&args);

    info!("cohort-tables v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_tables(&args) {
        error!("Table build failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Handle --init-config: generate a default .cohort-tables.toml in the root.
fn handle_init_config(args: &Args) -> Result<()> {
    let path = args.root.join(DEFAULT_CONFIG_FILE);

    if path.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first or edit it manually.",
            path.display()
        );
    }

    let content = Config::default_toml();
    std::fs::write(&path, &content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Created {} with default settings.", path.display());
    println!("   Edit it to customize analyses, paths and supplementary tables.");
    Ok(())
}

/// Initialize logging based on verbosity settings. `RUST_LOG`, when set,
/// takes precedence over the flags.
fn init_logging(args: &Args) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(args.env_filter(rust_log.as_deref()))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location; a file that exists but does not parse is fatal
    match Config::load_default(&args.root)? {
        Some(config) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Run the complete table build and print the summary.
fn run_tables(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    let config = load_config(args)?;
    let layout = config.layout(&args.root);

    if !args.quiet {
        println!("📥 Collecting results under {}", layout.root().display());
        println!(
            "   {} analyses × {} factor models",
            config.study.analyses.len(),
            config.study.factor_models.len()
        );
    }

    let options = RunOptions {
        show_progress: !args.quiet,
    };
    let summary = pipeline::run(&config, &layout, options)?;

    if !args.quiet {
        print_summary(&summary, start_time.elapsed().as_secs_f64())?;
    }

    Ok(())
}

fn print_summary(summary: &RunSummary, duration: f64) -> Result<()> {
    for written in &summary.tables {
        let preview = report::generate_preview(&written.title, &written.table)
            .with_context(|| format!("Failed to render preview of {}", written.title))?;
        println!("\n{}", preview);
    }

    println!("\n📊 Build Summary:");
    for (metric_type, rows) in &summary.collected {
        println!("   {}: {} rows collected", metric_type, rows);
    }
    println!("   Shaped rows: {}", summary.shaped_rows);
    for written in &summary.tables {
        println!(
            "   📄 {} ({} rows) → {}",
            written.title,
            written.table.height(),
            written.path.display()
        );
    }
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Tables complete!");
    Ok(())
}
