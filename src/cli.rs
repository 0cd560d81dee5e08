//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and log level selection.

use clap::Parser;
use std::path::PathBuf;

/// Ticketboard - support ticket spreadsheets to charts
///
/// Consolidates one spreadsheet per period into a single file, computes
/// ticket breakdowns (hour, weekday, month, catalog item, requester,
/// rating, week) and renders them as PNG charts for a web dashboard.
///
/// Examples:
///   ticketboard
///   ticketboard --data-dir ./dados_tiflux --graphs-dir ./graficos
///   ticketboard --serve --bind 0.0.0.0:5000
///   ticketboard --dry-run
///   ticketboard --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory with the source spreadsheets (one per period)
    #[arg(short, long, value_name = "DIR", env = "TICKETBOARD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory the chart images are written to
    #[arg(short, long, value_name = "DIR", env = "TICKETBOARD_GRAPHS_DIR")]
    pub graphs_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .ticketboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Start the web dashboard instead of running once
    #[arg(long)]
    pub serve: bool,

    /// Address the dashboard listens on (with --serve)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Entries kept in ranked charts of the whole dataset
    #[arg(long, value_name = "N")]
    pub top_n_total: Option<usize>,

    /// Entries kept in ranked charts of a single period
    #[arg(long, value_name = "N")]
    pub top_n_period: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// List the spreadsheets that would be loaded and exit
    #[arg(long, conflicts_with = "serve")]
    pub dry_run: bool,

    /// Generate a default .ticketboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.top_n_total == Some(0) || self.top_n_period == Some(0) {
            return Err("Top-N values must be at least 1".to_string());
        }

        if let Some(ref bind) = self.bind {
            if bind.parse::<std::net::SocketAddr>().is_err() {
                return Err(format!("Invalid bind address: {}", bind));
            }
        }

        if let Some(ref data_dir) = self.data_dir {
            if data_dir.exists() && !data_dir.is_dir() {
                return Err(format!(
                    "Data path is not a directory: {}",
                    data_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
