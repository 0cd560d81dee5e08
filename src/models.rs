//! Data models for the ticket dashboard.
//!
//! This module contains the core data structures shared by the loader,
//! the aggregator and the report assembler: typed cells, ticket records,
//! the consolidated table and the aggregates derived from it.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Name of the derived period column.
pub const PERIOD_COLUMN: &str = "Periodo";
/// Name of the derived day-of-week column.
pub const WEEKDAY_COLUMN: &str = "Dia_Semana";
/// Name of the derived hour-of-day column.
pub const HOUR_COLUMN: &str = "Hora";

/// A typed spreadsheet value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Whether the cell carries no usable value (blank text counts as empty).
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Text form of the cell used for categorical grouping.
    ///
    /// Whole numbers are rendered without a fractional part so that a
    /// rating of `5` read from a workbook groups with `"5"` read from CSV.
    pub fn as_label(&self) -> Option<String> {
        if self.is_missing() {
            return None;
        }
        match self {
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            Cell::Number(n) => Some(n.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::DateTime(dt) => Some(dt.format("%d/%m/%Y %H:%M").to_string()),
            Cell::Empty => None,
        }
    }
}

/// One support ticket, after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRecord {
    /// When the ticket was opened. Always present after loading.
    pub started_at: NaiveDateTime,
    /// When an agent took the ticket.
    pub assumed_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    /// Catalog item describing the ticket type.
    pub catalog_item: Option<String>,
    /// Requester / customer label.
    pub requester: Option<String>,
    /// Satisfaction rating, as written in the source.
    pub rating: Option<String>,
    /// Period label of the source file, assigned once at ingestion.
    pub period: String,
    /// Every normalized source column of the row.
    pub fields: BTreeMap<String, Cell>,
}

impl TicketRecord {
    /// Day of the week the ticket was opened.
    pub fn weekday(&self) -> Weekday {
        self.started_at.weekday()
    }

    /// Hour of the day (0-23) the ticket was opened.
    pub fn hour(&self) -> u32 {
        self.started_at.hour()
    }

    /// Time from opening until an agent took the ticket.
    pub fn response_time(&self) -> Option<chrono::Duration> {
        self.assumed_at
            .map(|assumed| assumed - self.started_at)
            .filter(|d| *d >= chrono::Duration::zero())
    }

    /// Time from opening to completion, when both are known.
    pub fn resolution_time(&self) -> Option<chrono::Duration> {
        self.finished_at
            .map(|finished| finished - self.started_at)
            .filter(|d| *d >= chrono::Duration::zero())
    }
}

/// Per-file statistics collected while loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSummary {
    /// Path of the source file.
    pub path: PathBuf,
    /// Period label derived from the file name.
    pub period: String,
    /// Data rows read from the file.
    pub rows_read: usize,
    /// Rows kept after dropping unparseable start times.
    pub rows_kept: usize,
}

/// The unified dataset built from every source file.
#[derive(Debug, Clone, Default)]
pub struct ConsolidatedTable {
    columns: Vec<String>,
    records: Vec<TicketRecord>,
    sources: Vec<SourceSummary>,
}

impl ConsolidatedTable {
    pub fn new(
        columns: Vec<String>,
        records: Vec<TicketRecord>,
        sources: Vec<SourceSummary>,
    ) -> Self {
        Self {
            columns,
            records,
            sources,
        }
    }

    /// Normalized source columns, in first-seen order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether any source file carried the given normalized column.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn records(&self) -> &[TicketRecord] {
        &self.records
    }

    pub fn sources(&self) -> &[SourceSummary] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows dropped across all sources because the start time was missing.
    pub fn dropped_rows(&self) -> usize {
        self.sources.iter().map(|s| s.rows_read - s.rows_kept).sum()
    }

    /// Distinct period labels, in order of first appearance.
    pub fn periods(&self) -> Vec<String> {
        let mut periods: Vec<String> = Vec::new();
        for record in &self.records {
            if !periods.contains(&record.period) {
                periods.push(record.period.clone());
            }
        }
        periods
    }

    /// Records matching a period filter.
    pub fn filtered<'a>(
        &'a self,
        filter: &'a PeriodFilter,
    ) -> impl Iterator<Item = &'a TicketRecord> + 'a {
        self.records.iter().filter(move |r| filter.matches(r))
    }
}

/// Restricts an aggregation to one period or to the whole table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodFilter {
    All,
    Period(String),
}

impl PeriodFilter {
    pub fn matches(&self, record: &TicketRecord) -> bool {
        match self {
            PeriodFilter::All => true,
            PeriodFilter::Period(p) => &record.period == p,
        }
    }
}

impl fmt::Display for PeriodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodFilter::All => write!(f, "Total"),
            PeriodFilter::Period(p) => write!(f, "{}", p),
        }
    }
}

/// The breakdowns the dashboard knows how to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Hour,
    Weekday,
    Period,
    CatalogItem,
    Requester,
    Rating,
    Week,
}

impl AggregateKind {
    /// Every kind, in the order charts are generated.
    pub const ALL: [AggregateKind; 7] = [
        AggregateKind::Hour,
        AggregateKind::Weekday,
        AggregateKind::Period,
        AggregateKind::CatalogItem,
        AggregateKind::Requester,
        AggregateKind::Rating,
        AggregateKind::Week,
    ];

    /// File name prefix of the chart images for this kind.
    pub fn file_stem(&self) -> &'static str {
        match self {
            AggregateKind::Hour => "chamados_por_hora",
            AggregateKind::Weekday => "chamados_por_dia",
            AggregateKind::Period => "chamados_por_mes",
            AggregateKind::CatalogItem => "itens_catalogo",
            AggregateKind::Requester => "clientes",
            AggregateKind::Rating => "avaliacoes",
            AggregateKind::Week => "chamados_por_semana",
        }
    }

    /// Chart title.
    pub fn title(&self) -> &'static str {
        match self {
            AggregateKind::Hour => "Chamados por Hora do Dia",
            AggregateKind::Weekday => "Chamados por Dia da Semana",
            AggregateKind::Period => "Chamados por Mês",
            AggregateKind::CatalogItem => "Problemas mais recorrentes",
            AggregateKind::Requester => "Clientes com mais chamados",
            AggregateKind::Rating => "Avaliações",
            AggregateKind::Week => "Volume de Chamados por Semana",
        }
    }

    /// Label of the category axis.
    pub fn category_label(&self) -> &'static str {
        match self {
            AggregateKind::Hour => "Hora do Dia",
            AggregateKind::Weekday => "Dia da Semana",
            AggregateKind::Period => "Mês",
            AggregateKind::CatalogItem => "Item do Catálogo",
            AggregateKind::Requester => "Cliente",
            AggregateKind::Rating => "Avaliação",
            AggregateKind::Week => "Semana do Ano",
        }
    }

    /// Whether the kind is truncated to a top-N list.
    pub fn is_ranked(&self) -> bool {
        matches!(self, AggregateKind::CatalogItem | AggregateKind::Requester)
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_stem())
    }
}

/// One bucket of an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateEntry {
    pub label: String,
    pub count: usize,
}

impl AggregateEntry {
    pub fn new(label: impl Into<String>, count: usize) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// An ordered category -> count mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub kind: AggregateKind,
    pub filter: PeriodFilter,
    pub entries: Vec<AggregateEntry>,
}

impl Aggregate {
    pub fn new(kind: AggregateKind, filter: PeriodFilter, entries: Vec<AggregateEntry>) -> Self {
        Self {
            kind,
            filter,
            entries,
        }
    }

    pub fn empty(kind: AggregateKind, filter: PeriodFilter) -> Self {
        Self::new(kind, filter, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all bucket counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }
}

/// Result of computing one aggregate kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Breakdown {
    /// The aggregate was computed (it may still have no entries).
    Computed(Aggregate),
    /// The grouping column is absent from every source file.
    Absent { column: String },
}

/// A chart image produced by a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedChart {
    pub kind: AggregateKind,
    pub period: String,
    pub path: PathBuf,
    pub total: usize,
}

/// A chart a run decided not to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedChart {
    pub kind: AggregateKind,
    pub period: String,
    pub reason: String,
}

/// Headline figures for the whole table or one period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketSummary {
    /// Label of the slice ("Total" or a period).
    pub label: String,
    /// Whether this summary covers the whole table rather than one period.
    pub is_total: bool,
    pub total: usize,
    /// Tickets with a rating.
    pub rated: usize,
    /// Tickets without a catalog item.
    pub without_catalog_item: usize,
    /// Mean time until an agent took the ticket, in minutes.
    pub mean_response_minutes: Option<f64>,
    /// Mean time to completion in minutes, over tickets with both timestamps.
    pub mean_resolution_minutes: Option<f64>,
}

impl TicketSummary {
    /// Share of rated tickets, in percent.
    pub fn rated_percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.rated as f64 / self.total as f64 * 100.0
        }
    }
}

/// Everything one successful generation run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub source_files: Vec<SourceSummary>,
    pub total_rows: usize,
    pub dropped_rows: usize,
    pub periods: Vec<String>,
    pub consolidated_file: PathBuf,
    pub charts: Vec<GeneratedChart>,
    pub skipped: Vec<SkippedChart>,
    pub summaries: Vec<TicketSummary>,
    /// Top catalog items of the whole table, for the markdown summary.
    pub top_catalog_items: Vec<AggregateEntry>,
    pub duration_seconds: f64,
}

/// Single status of a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,
}

impl RunOutcome {
    pub fn succeeded(report: RunReport) -> Self {
        Self {
            success: true,
            message: "Dados atualizados com sucesso!".to_string(),
            report: Some(report),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            report: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(period: &str, day: u32, hour: u32) -> TicketRecord {
        TicketRecord {
            started_at: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(hour, 15, 0)
                .unwrap(),
            assumed_at: None,
            finished_at: None,
            catalog_item: None,
            requester: None,
            rating: None,
            period: period.to_string(),
            fields: BTreeMap::new(),
        }
    }

    #[test]
    fn test_cell_missing_and_label() {
        assert!(Cell::Empty.is_missing());
        assert!(Cell::Text("   ".to_string()).is_missing());
        assert!(!Cell::Text("Impressora".to_string()).is_missing());
        assert_eq!(Cell::Number(5.0).as_label(), Some("5".to_string()));
        assert_eq!(Cell::Number(4.5).as_label(), Some("4.5".to_string()));
        assert_eq!(
            Cell::Text("  Rede  ".to_string()).as_label(),
            Some("Rede".to_string())
        );
        assert_eq!(Cell::Empty.as_label(), None);
    }

    #[test]
    fn test_record_derived_fields() {
        // 2024-01-01 was a Monday
        let r = record("Janeiro", 1, 9);
        assert_eq!(r.weekday(), Weekday::Mon);
        assert_eq!(r.hour(), 9);
        assert_eq!(r.resolution_time(), None);

        let mut finished = r.clone();
        finished.finished_at = Some(r.started_at + chrono::Duration::minutes(90));
        assert_eq!(finished.resolution_time(), Some(chrono::Duration::minutes(90)));
    }

    #[test]
    fn test_table_periods_first_appearance() {
        let table = ConsolidatedTable::new(
            vec!["Iniciado_em".to_string()],
            vec![
                record("Fevereiro", 1, 8),
                record("Janeiro", 2, 9),
                record("Fevereiro", 3, 10),
            ],
            Vec::new(),
        );
        assert_eq!(table.periods(), vec!["Fevereiro", "Janeiro"]);

        let filter = PeriodFilter::Period("Fevereiro".to_string());
        assert_eq!(table.filtered(&filter).count(), 2);
        assert_eq!(table.filtered(&PeriodFilter::All).count(), 3);
        assert!(table.has_column("Iniciado_em"));
        assert!(!table.has_column("Item_do_Catálogo"));
    }

    #[test]
    fn test_summary_percentage() {
        let summary = TicketSummary {
            label: "Total".to_string(),
            total: 8,
            rated: 2,
            ..Default::default()
        };
        assert_eq!(summary.rated_percentage(), 25.0);
        assert_eq!(TicketSummary::default().rated_percentage(), 0.0);
    }

    #[test]
    fn test_kind_file_stems_are_unique() {
        let mut stems: Vec<_> = AggregateKind::ALL.iter().map(|k| k.file_stem()).collect();
        stems.sort();
        stems.dedup();
        assert_eq!(stems.len(), AggregateKind::ALL.len());
    }
}
