//! Ticket aggregation.
//!
//! Every function here counts the records of a [`ConsolidatedTable`]
//! (optionally restricted to one period) grouped by a derived dimension and
//! returns an [`Aggregate`] of the same shape whether or not a period filter
//! is applied.

use crate::loader::ColumnNames;
use crate::models::{
    Aggregate, AggregateEntry, AggregateKind, Breakdown, ConsolidatedTable, PeriodFilter,
    TicketRecord,
};
use chrono::{Datelike, Weekday};
use std::collections::{BTreeMap, HashMap};

/// Presentation labels, Monday first.
pub const WEEKDAY_LABELS: [&str; 7] = [
    "Segunda-feira",
    "Terça-feira",
    "Quarta-feira",
    "Quinta-feira",
    "Sexta-feira",
    "Sábado",
    "Domingo",
];

const MONTH_NAMES: [(&str, &str); 12] = [
    ("janeiro", "january"),
    ("fevereiro", "february"),
    ("marco", "march"),
    ("abril", "april"),
    ("maio", "may"),
    ("junho", "june"),
    ("julho", "july"),
    ("agosto", "august"),
    ("setembro", "september"),
    ("outubro", "october"),
    ("novembro", "november"),
    ("dezembro", "december"),
];

/// Settings shared by every breakdown of a run.
#[derive(Debug, Clone)]
pub struct AggregateSettings {
    pub columns: ColumnNames,
    /// Ranked entries kept for the whole table.
    pub top_n_total: usize,
    /// Ranked entries kept for a single period.
    pub top_n_period: usize,
}

impl Default for AggregateSettings {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            top_n_total: 15,
            top_n_period: 10,
        }
    }
}

impl From<&crate::config::Config> for AggregateSettings {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            columns: ColumnNames::from(&config.columns),
            top_n_total: config.report.top_n_total,
            top_n_period: config.report.top_n_period,
        }
    }
}

impl AggregateSettings {
    /// Top-N applicable to the given filter.
    pub fn top_n(&self, filter: &PeriodFilter) -> usize {
        match filter {
            PeriodFilter::All => self.top_n_total,
            PeriodFilter::Period(_) => self.top_n_period,
        }
    }

    /// Source column a kind depends on, if it is optional data.
    pub fn optional_column(&self, kind: AggregateKind) -> Option<&str> {
        match kind {
            AggregateKind::CatalogItem => Some(self.columns.catalog_item.as_str()),
            AggregateKind::Requester => Some(self.columns.requester.as_str()),
            AggregateKind::Rating => Some(self.columns.rating.as_str()),
            _ => None,
        }
    }
}

/// Compute one kind of breakdown.
///
/// Returns [`Breakdown::Absent`] when the kind depends on an optional column
/// that no source file carried.
pub fn compute(
    table: &ConsolidatedTable,
    kind: AggregateKind,
    filter: &PeriodFilter,
    settings: &AggregateSettings,
) -> Breakdown {
    if let Some(column) = settings.optional_column(kind) {
        if !table.has_column(column) {
            return Breakdown::Absent {
                column: column.to_string(),
            };
        }
    }

    let columns = &settings.columns;
    let aggregate = match kind {
        AggregateKind::Hour => by_hour(table, filter),
        AggregateKind::Weekday => by_weekday(table, filter),
        AggregateKind::Period => by_period(table, filter),
        AggregateKind::CatalogItem => {
            by_catalog_item(table, filter, &columns.catalog_item, settings.top_n(filter))
        }
        AggregateKind::Requester => {
            by_requester(table, filter, &columns.requester, settings.top_n(filter))
        }
        AggregateKind::Rating => by_rating(table, filter, &columns.rating),
        AggregateKind::Week => by_week(table, filter),
    };
    Breakdown::Computed(aggregate)
}

/// Tickets per hour of the day: always 24 buckets, `0` to `23`.
pub fn by_hour(table: &ConsolidatedTable, filter: &PeriodFilter) -> Aggregate {
    let mut counts = [0usize; 24];
    for record in table.filtered(filter) {
        counts[record.hour() as usize] += 1;
    }

    let entries = counts
        .iter()
        .enumerate()
        .map(|(hour, count)| AggregateEntry::new(hour.to_string(), *count))
        .collect();
    Aggregate::new(AggregateKind::Hour, filter.clone(), entries)
}

/// Tickets per weekday: always 7 buckets, Monday to Sunday.
pub fn by_weekday(table: &ConsolidatedTable, filter: &PeriodFilter) -> Aggregate {
    let mut counts = [0usize; 7];
    for record in table.filtered(filter) {
        counts[record.weekday().num_days_from_monday() as usize] += 1;
    }

    let entries = std::iter::successors(Some(Weekday::Mon), |day| Some(day.succ()))
        .zip(counts)
        .map(|(day, count)| AggregateEntry::new(weekday_label(day), count))
        .collect();
    Aggregate::new(AggregateKind::Weekday, filter.clone(), entries)
}

/// Presentation label of a weekday.
pub fn weekday_label(day: Weekday) -> &'static str {
    WEEKDAY_LABELS[day.num_days_from_monday() as usize]
}

/// Tickets per period label.
///
/// Month names come first in calendar order; any other label follows in
/// order of first appearance.
pub fn by_period(table: &ConsolidatedTable, filter: &PeriodFilter) -> Aggregate {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for record in table.filtered(filter) {
        let count = counts.entry(record.period.clone()).or_default();
        if *count == 0 {
            order.push(record.period.clone());
        }
        *count += 1;
    }

    // stable: non-month labels keep their first-appearance order
    order.sort_by_key(|label| month_index(label).unwrap_or(u32::MAX));

    let entries = order
        .into_iter()
        .map(|label| {
            let count = counts.get(&label).copied().unwrap_or(0);
            AggregateEntry::new(label, count)
        })
        .collect();
    Aggregate::new(AggregateKind::Period, filter.clone(), entries)
}

/// Calendar month (1-12) of a Portuguese or English month name.
pub fn month_index(label: &str) -> Option<u32> {
    let folded = fold_accents(&label.trim().to_lowercase());
    MONTH_NAMES
        .iter()
        .position(|(pt, en)| folded == *pt || folded == *en)
        .map(|i| i as u32 + 1)
}

fn fold_accents(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'ê' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ô' | 'õ' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Most frequent catalog items, descending, truncated to `top_n`.
pub fn by_catalog_item(
    table: &ConsolidatedTable,
    filter: &PeriodFilter,
    column: &str,
    top_n: usize,
) -> Aggregate {
    ranked(
        table,
        filter,
        AggregateKind::CatalogItem,
        column,
        top_n,
        |r| r.catalog_item.as_deref(),
    )
}

/// Requesters with the most tickets, descending, truncated to `top_n`.
pub fn by_requester(
    table: &ConsolidatedTable,
    filter: &PeriodFilter,
    column: &str,
    top_n: usize,
) -> Aggregate {
    ranked(
        table,
        filter,
        AggregateKind::Requester,
        column,
        top_n,
        |r| r.requester.as_deref(),
    )
}

fn ranked<F>(
    table: &ConsolidatedTable,
    filter: &PeriodFilter,
    kind: AggregateKind,
    column: &str,
    top_n: usize,
    value: F,
) -> Aggregate
where
    F: Fn(&TicketRecord) -> Option<&str>,
{
    if !table.has_column(column) {
        return Aggregate::empty(kind, filter.clone());
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in table.filtered(filter) {
        if let Some(label) = value(record) {
            *counts.entry(label).or_default() += 1;
        }
    }

    let mut entries: Vec<AggregateEntry> = counts
        .into_iter()
        .map(|(label, count)| AggregateEntry::new(label, count))
        .collect();
    // ties break on the label so repeated runs agree
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    entries.truncate(top_n);

    Aggregate::new(kind, filter.clone(), entries)
}

/// Tickets per rating, over rated tickets only, ascending by rating.
pub fn by_rating(table: &ConsolidatedTable, filter: &PeriodFilter, column: &str) -> Aggregate {
    if !table.has_column(column) {
        return Aggregate::empty(AggregateKind::Rating, filter.clone());
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in table.filtered(filter) {
        if let Some(rating) = record.rating.as_deref() {
            *counts.entry(rating).or_default() += 1;
        }
    }

    let mut entries: Vec<AggregateEntry> = counts
        .into_iter()
        .map(|(label, count)| AggregateEntry::new(label, count))
        .collect();
    entries.sort_by(|a, b| compare_ratings(&a.label, &b.label));

    Aggregate::new(AggregateKind::Rating, filter.clone(), entries)
}

/// Numeric ratings first (numerically), then text ratings (lexically).
fn compare_ratings(a: &str, b: &str) -> std::cmp::Ordering {
    let parse = |s: &str| s.replace(',', ".").parse::<f64>().ok();
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Weekly counting pass: tickets per ISO week, chronological.
pub fn by_week(table: &ConsolidatedTable, filter: &PeriodFilter) -> Aggregate {
    let mut counts: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for record in table.filtered(filter) {
        let week = record.started_at.iso_week();
        *counts.entry((week.year(), week.week())).or_default() += 1;
    }

    let entries = counts
        .into_iter()
        .map(|((year, week), count)| AggregateEntry::new(format!("S{:02}/{}", week, year), count))
        .collect();
    Aggregate::new(AggregateKind::Week, filter.clone(), entries)
}
