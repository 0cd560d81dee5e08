//! Headline statistics for a table slice.

use crate::models::{ConsolidatedTable, PeriodFilter, TicketSummary};

/// Summarize the records matching `filter`.
pub fn summarize(table: &ConsolidatedTable, filter: &PeriodFilter) -> TicketSummary {
    let mut summary = TicketSummary {
        label: filter.to_string(),
        is_total: *filter == PeriodFilter::All,
        ..Default::default()
    };

    let mut responded = 0usize;
    let mut response_minutes = 0i64;
    let mut resolved = 0usize;
    let mut resolution_minutes = 0i64;

    for record in table.filtered(filter) {
        summary.total += 1;
        if record.rating.is_some() {
            summary.rated += 1;
        }
        if record.catalog_item.is_none() {
            summary.without_catalog_item += 1;
        }
        if let Some(duration) = record.response_time() {
            responded += 1;
            response_minutes += duration.num_minutes();
        }
        if let Some(duration) = record.resolution_time() {
            resolved += 1;
            resolution_minutes += duration.num_minutes();
        }
    }

    if responded > 0 {
        summary.mean_response_minutes = Some(response_minutes as f64 / responded as f64);
    }
    if resolved > 0 {
        summary.mean_resolution_minutes = Some(resolution_minutes as f64 / resolved as f64);
    }

    summary
}

/// Summaries of the whole table followed by each period.
pub fn summarize_all(table: &ConsolidatedTable) -> Vec<TicketSummary> {
    std::iter::once(PeriodFilter::All)
        .chain(table.periods().into_iter().map(PeriodFilter::Period))
        .map(|filter| summarize(table, &filter))
        .collect()
}

/// Format a duration in minutes as `Xh YYmin`.
pub fn format_minutes(minutes: f64) -> String {
    let total = minutes.round() as i64;
    let hours = total / 60;
    let rest = total % 60;
    if hours > 0 {
        format!("{}h {:02}min", hours, rest)
    } else {
        format!("{}min", rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TicketRecord;
    use chrono::{Duration, NaiveDate};
    use std::collections::BTreeMap;

    fn record(period: &str, minutes_to_finish: Option<i64>, rated: bool) -> TicketRecord {
        let started_at = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        TicketRecord {
            started_at,
            assumed_at: minutes_to_finish.map(|_| started_at + Duration::minutes(15)),
            finished_at: minutes_to_finish.map(|m| started_at + Duration::minutes(m)),
            catalog_item: if rated { Some("Rede".to_string()) } else { None },
            requester: None,
            rating: if rated { Some("5".to_string()) } else { None },
            period: period.to_string(),
            fields: BTreeMap::new(),
        }
    }

    #[test]
    fn test_summarize() {
        let table = ConsolidatedTable::new(
            Vec::new(),
            vec![
                record("Janeiro", Some(30), true),
                record("Janeiro", Some(90), false),
                record("Fevereiro", None, false),
                record("Fevereiro", Some(-10), true),
            ],
            Vec::new(),
        );

        let total = summarize(&table, &PeriodFilter::All);
        assert_eq!(total.label, "Total");
        assert!(total.is_total);
        assert_eq!(total.total, 4);
        assert_eq!(total.rated, 2);
        assert_eq!(total.without_catalog_item, 2);
        // the negative duration is ignored
        assert_eq!(total.mean_resolution_minutes, Some(60.0));
        assert_eq!(total.mean_response_minutes, Some(15.0));

        let all = summarize_all(&table);
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].label, "Janeiro");
        assert!(!all[1].is_total);
        assert_eq!(all[2].label, "Fevereiro");
        assert_eq!(all[2].mean_resolution_minutes, None);
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(45.0), "45min");
        assert_eq!(format_minutes(125.4), "2h 05min");
    }
}
