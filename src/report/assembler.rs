//! One generation run: load, persist, chart, summarize.
//!
//! [`ReportAssembler::run`] is the error boundary of the pipeline. Any
//! failure is logged and folded into a failed [`RunOutcome`]; there is no
//! partial success.

use crate::analysis::{compute, summarize_all, AggregateSettings};
use crate::config::Config;
use crate::error::ReportError;
use crate::loader::RecordLoader;
use crate::models::{
    AggregateKind, Breakdown, GeneratedChart, PeriodFilter, RunOutcome, RunReport, SkippedChart,
};
use crate::report::chart::{ChartRenderer, ChartSpec, PlottersRenderer};
use crate::report::consolidated::write_consolidated;
use crate::report::gallery::chart_paths;
use crate::report::generator::generate_markdown_summary;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// File name of the markdown summary written next to the charts.
pub const SUMMARY_FILE_NAME: &str = "relatorio.md";

/// Runs the whole pipeline against one configuration.
pub struct ReportAssembler {
    config: Config,
    settings: AggregateSettings,
    renderer: Box<dyn ChartRenderer>,
    show_progress: bool,
}

impl ReportAssembler {
    pub fn new(config: Config, renderer: Box<dyn ChartRenderer>) -> Self {
        let settings = AggregateSettings::from(&config);
        Self {
            config,
            settings,
            renderer,
            show_progress: false,
        }
    }

    /// Assembler drawing PNG charts at the configured size.
    pub fn with_plotters(config: Config) -> Self {
        let renderer = PlottersRenderer::new(config.report.chart_width, config.report.chart_height);
        Self::new(config, Box::new(renderer))
    }

    /// Show a progress bar while rendering charts.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run once and report a single status.
    pub fn run(&self) -> RunOutcome {
        match self.try_run() {
            Ok(report) => {
                info!(
                    "Run complete: {} charts, {} skipped, {:.1}s",
                    report.charts.len(),
                    report.skipped.len(),
                    report.duration_seconds
                );
                RunOutcome::succeeded(report)
            }
            Err(e) => {
                error!("Run failed during {} step: {}", e.step(), e);
                RunOutcome::failed(format!("Erro ao atualizar dados ({}): {}", e.step(), e))
            }
        }
    }

    /// Run once, returning the typed error of the failing step.
    pub fn try_run(&self) -> Result<RunReport, ReportError> {
        let start_time = Instant::now();
        let graphs_dir = &self.config.paths.graphs_dir;

        info!("Step 1/5: preparing {}", graphs_dir.display());
        std::fs::create_dir_all(graphs_dir).map_err(|source| ReportError::OutputDir {
            path: graphs_dir.clone(),
            source,
        })?;

        info!(
            "Step 2/5: loading spreadsheets from {}",
            self.config.paths.data_dir.display()
        );
        let table = RecordLoader::from_config(&self.config).load()?;

        let consolidated_file = self.config.consolidated_path();
        info!("Step 3/5: writing {}", consolidated_file.display());
        write_consolidated(&table, &consolidated_file).map_err(|source| ReportError::Persist {
            path: consolidated_file.clone(),
            source,
        })?;

        let periods = table.periods();
        let filters: Vec<PeriodFilter> = std::iter::once(PeriodFilter::All)
            .chain(periods.iter().cloned().map(PeriodFilter::Period))
            .collect();
        let suffixes = chart_suffixes(&filters, &self.config.report.total_suffix);

        // Charts of kinds or periods that are no longer produced must not linger.
        for stale in chart_paths(graphs_dir) {
            debug!("Removing previous chart {}", stale.display());
            std::fs::remove_file(&stale)
                .map_err(|source| ReportError::OutputDir { path: stale, source })?;
        }

        info!(
            "Step 4/5: rendering charts for the total and {} period(s)",
            periods.len()
        );
        let progress = self.progress_bar((filters.len() * AggregateKind::ALL.len()) as u64);
        let mut charts = Vec::new();
        let mut skipped = Vec::new();
        let mut top_catalog_items = Vec::new();

        for (filter, suffix) in filters.iter().zip(&suffixes) {
            for kind in AggregateKind::ALL {
                let file_name = chart_file_name(kind, suffix);
                progress.set_message(file_name.clone());

                match compute(&table, kind, filter, &self.settings) {
                    Breakdown::Absent { column } => {
                        debug!("Skipping {}: column '{}' not found", file_name, column);
                        skipped.push(SkippedChart {
                            kind,
                            period: filter.to_string(),
                            reason: format!("coluna '{}' não encontrada", column),
                        });
                    }
                    Breakdown::Computed(aggregate) if aggregate.is_empty() => {
                        debug!("Skipping {}: no data", file_name);
                        skipped.push(SkippedChart {
                            kind,
                            period: filter.to_string(),
                            reason: "sem dados".to_string(),
                        });
                    }
                    Breakdown::Computed(aggregate) => {
                        let path = graphs_dir.join(&file_name);
                        self.renderer
                            .render(&ChartSpec::for_aggregate(&aggregate), &path)
                            .map_err(|source| ReportError::Render {
                                path: path.clone(),
                                source,
                            })?;

                        if kind == AggregateKind::CatalogItem && *filter == PeriodFilter::All {
                            top_catalog_items = aggregate.entries.clone();
                        }
                        charts.push(GeneratedChart {
                            kind,
                            period: filter.to_string(),
                            path,
                            total: aggregate.total(),
                        });
                    }
                }
                progress.inc(1);
            }
        }
        progress.finish_and_clear();

        let report = RunReport {
            generated_at: Utc::now(),
            source_files: table.sources().to_vec(),
            total_rows: table.len(),
            dropped_rows: table.dropped_rows(),
            periods,
            consolidated_file,
            charts,
            skipped,
            summaries: summarize_all(&table),
            top_catalog_items,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        };

        let summary_path = self.summary_path();
        info!("Step 5/5: writing {}", summary_path.display());
        std::fs::write(&summary_path, generate_markdown_summary(&report)).map_err(|source| {
            ReportError::Summary {
                path: summary_path.clone(),
                source,
            }
        })?;

        Ok(report)
    }

    fn summary_path(&self) -> PathBuf {
        self.config.paths.graphs_dir.join(SUMMARY_FILE_NAME)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

/// Image file name for one kind and file name suffix.
pub fn chart_file_name(kind: AggregateKind, suffix: &str) -> String {
    format!("{}_{}.png", kind.file_stem(), suffix)
}

/// File name suffix of every filter, in order, with no two alike.
///
/// The total takes `total_suffix`. A period takes its label lowercased with
/// spaces turned into `_`, so `Marco 2024` becomes `marco_2024`. A period
/// whose suffix is already taken gets `_2`, `_3`, ... appended.
pub fn chart_suffixes(filters: &[PeriodFilter], total_suffix: &str) -> Vec<String> {
    let mut taken = HashSet::new();
    let mut suffixes = Vec::with_capacity(filters.len());

    for filter in filters {
        let base = match filter {
            PeriodFilter::All => total_suffix.to_string(),
            PeriodFilter::Period(period) => period.trim().to_lowercase().replace(' ', "_"),
        };
        let mut suffix = base.clone();
        let mut n = 2;
        while !taken.insert(suffix.clone()) {
            suffix = format!("{}_{}", base, n);
            n += 1;
        }
        if suffix != base {
            warn!(
                "Charts for '{}' would overwrite '{}' charts, using suffix '{}'",
                filter, base, suffix
            );
        }
        suffixes.push(suffix);
    }
    suffixes
}
