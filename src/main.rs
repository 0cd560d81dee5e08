//! Ticketboard - support ticket spreadsheets to charts
//!
//! Consolidates one spreadsheet per period into a single workbook, renders
//! ticket breakdowns as PNG charts and serves them on a small dashboard.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Invalid arguments or a failed generation run

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod report;
mod scanner;
mod server;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use loader::RecordLoader;
use report::ReportAssembler;
use std::path::Path;
use tracing::{debug, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Ticketboard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.ensure_directories()?;

    if args.dry_run {
        return handle_dry_run(&config);
    }

    if args.serve {
        let assembler = ReportAssembler::with_plotters(config.clone());
        return server::run(server::AppState::new(config, assembler)).await;
    }

    let exit_code = run_once(config, !args.quiet).await?;
    std::process::exit(exit_code);
}

/// Handle --init-config: generate a default .ticketboard.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize directories, column names, top-N and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run one generation and print a summary. Returns the exit code.
async fn run_once(config: Config, show_progress: bool) -> Result<i32> {
    println!(
        "📥 Loading spreadsheets from {}",
        config.paths.data_dir.display()
    );

    let assembler = ReportAssembler::with_plotters(config).show_progress(show_progress);
    let outcome = tokio::task::spawn_blocking(move || assembler.run())
        .await
        .context("Generation task failed")?;

    let report = match outcome.report {
        Some(report) if outcome.success => report,
        _ => {
            eprintln!("\n❌ {}", outcome.message);
            return Ok(1);
        }
    };

    println!("\n📊 Summary:");
    println!("   Source files: {}", report.source_files.len());
    println!(
        "   Tickets: {} ({} rows dropped without start time)",
        report.total_rows, report.dropped_rows
    );
    println!("   Periods: {}", report.periods.join(", "));
    println!(
        "   Charts: {} generated, {} skipped",
        report.charts.len(),
        report.skipped.len()
    );
    for skipped in &report.skipped {
        debug!(
            "Skipped {} ({}): {}",
            skipped.kind, skipped.period, skipped.reason
        );
    }
    println!("   Duration: {:.1}s", report.duration_seconds);
    println!(
        "\n✅ {} Consolidated file: {}",
        outcome.message,
        report.consolidated_file.display()
    );

    Ok(0)
}

/// Handle --dry-run: list the spreadsheets that would be loaded, exit.
fn handle_dry_run(config: &Config) -> Result<()> {
    println!("\n🔍 Dry run: scanning {}...\n", config.paths.data_dir.display());

    let record_loader = RecordLoader::from_config(config);
    let files = record_loader.source_files()?;

    if files.is_empty() {
        println!("   No spreadsheets found.");
    } else {
        println!("   Found {} spreadsheets that would be loaded:\n", files.len());
        for file in &files {
            println!(
                "     📄 {} → {} ({}, {} bytes)",
                file.path.display(),
                loader::period_label(&file.path),
                file.extension,
                file.size
            );
        }
        println!(
            "\n   Start time column: {}",
            record_loader.columns().started_at
        );
    }

    println!("\n✅ Dry run complete. No spreadsheet was read.");
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
