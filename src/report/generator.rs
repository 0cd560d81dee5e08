//! Markdown summary generation.
//!
//! This module renders the `relatorio.md` written after every successful
//! run: source files, per-period figures, the most frequent catalog items
//! and the list of generated and skipped charts.

use crate::analysis::format_minutes;
use crate::models::{
    AggregateEntry, GeneratedChart, RunReport, SkippedChart, SourceSummary, TicketSummary,
};

/// Generate the complete markdown summary of a run.
pub fn generate_markdown_summary(report: &RunReport) -> String {
    let mut output = String::new();

    output.push_str("# Relatório de Chamados\n\n");

    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_sources_section(&report.source_files));
    output.push_str(&generate_summary_section(&report.summaries));
    output.push_str(&generate_catalog_section(&report.top_catalog_items));
    output.push_str(&generate_charts_section(&report.charts));
    output.push_str(&generate_skipped_section(&report.skipped));

    output.push_str("---\n\n");
    output.push_str(&format!(
        "*Gerado por ticketboard v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    output
}

fn generate_metadata_section(report: &RunReport) -> String {
    let mut section = String::new();

    section.push_str("## Execução\n\n");
    section.push_str(&format!(
        "- **Gerado em:** {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Planilhas lidas:** {}\n",
        report.source_files.len()
    ));
    section.push_str(&format!("- **Chamados:** {}\n", report.total_rows));
    if report.dropped_rows > 0 {
        section.push_str(&format!(
            "- **Linhas descartadas (sem data de início):** {}\n",
            report.dropped_rows
        ));
    }
    section.push_str(&format!(
        "- **Arquivo consolidado:** `{}`\n",
        report.consolidated_file.display()
    ));
    section.push_str(&format!(
        "- **Duração:** {:.1}s\n\n",
        report.duration_seconds
    ));

    section
}

fn generate_sources_section(sources: &[SourceSummary]) -> String {
    if sources.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Planilhas\n\n");
    section.push_str("| Arquivo | Período | Linhas lidas | Linhas mantidas |\n");
    section.push_str("|:---|:---|:---:|:---:|\n");

    for source in sources {
        let name = source
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.path.display().to_string());
        section.push_str(&format!(
            "| `{}` | {} | {} | {} |\n",
            name, source.period, source.rows_read, source.rows_kept
        ));
    }
    section.push('\n');

    section
}

fn generate_summary_section(summaries: &[TicketSummary]) -> String {
    let mut section = String::new();

    section.push_str("## Resumo por Período\n\n");
    section.push_str(
        "| Período | Chamados | Avaliados | Sem item de catálogo | Tempo médio de atendimento | Tempo médio de resolução |\n",
    );
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|\n");

    for summary in summaries {
        let response = summary
            .mean_response_minutes
            .map(format_minutes)
            .unwrap_or_else(|| "-".to_string());
        let resolution = summary
            .mean_resolution_minutes
            .map(format_minutes)
            .unwrap_or_else(|| "-".to_string());
        let label = if summary.is_total {
            format!("**{}**", summary.label)
        } else {
            summary.label.clone()
        };
        section.push_str(&format!(
            "| {} | {} | {} ({:.0}%) | {} | {} | {} |\n",
            label,
            summary.total,
            summary.rated,
            summary.rated_percentage(),
            summary.without_catalog_item,
            response,
            resolution
        ));
    }
    section.push('\n');

    section
}

fn generate_catalog_section(items: &[AggregateEntry]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Problemas mais recorrentes\n\n");
    for (i, item) in items.iter().enumerate() {
        section.push_str(&format!("{}. {} ({})\n", i + 1, item.label, item.count));
    }
    section.push('\n');

    section
}

fn generate_charts_section(charts: &[GeneratedChart]) -> String {
    let mut section = String::new();

    section.push_str("## Gráficos\n\n");
    if charts.is_empty() {
        section.push_str("Nenhum gráfico foi gerado.\n\n");
        return section;
    }

    let mut current_period: Option<&str> = None;
    for chart in charts {
        if current_period != Some(chart.period.as_str()) {
            if current_period.is_some() {
                section.push('\n');
            }
            section.push_str(&format!("### {}\n\n", chart.period));
            current_period = Some(chart.period.as_str());
        }
        let name = chart
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        section.push_str(&format!(
            "- {}: `{}` ({} chamados)\n",
            chart.kind.title(),
            name,
            chart.total
        ));
    }
    section.push('\n');

    section
}

fn generate_skipped_section(skipped: &[SkippedChart]) -> String {
    if skipped.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Gráficos não gerados\n\n");
    for chart in skipped {
        section.push_str(&format!(
            "- {} ({}): {}\n",
            chart.kind.title(),
            chart.period,
            chart.reason
        ));
    }
    section.push('\n');

    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AggregateKind;
    use chrono::Utc;
    use std::path::PathBuf;

    fn create_test_report() -> RunReport {
        RunReport {
            generated_at: Utc::now(),
            source_files: vec![SourceSummary {
                path: PathBuf::from("dados_tiflux/janeiro.xlsx"),
                period: "Janeiro".to_string(),
                rows_read: 12,
                rows_kept: 10,
            }],
            total_rows: 10,
            dropped_rows: 2,
            periods: vec!["Janeiro".to_string()],
            consolidated_file: PathBuf::from("dados_tiflux/dados_anuais.xlsx"),
            charts: vec![
                GeneratedChart {
                    kind: AggregateKind::Hour,
                    period: "Total".to_string(),
                    path: PathBuf::from("graficos/chamados_por_hora_total.png"),
                    total: 10,
                },
                GeneratedChart {
                    kind: AggregateKind::Hour,
                    period: "Janeiro".to_string(),
                    path: PathBuf::from("graficos/chamados_por_hora_janeiro.png"),
                    total: 10,
                },
            ],
            skipped: vec![SkippedChart {
                kind: AggregateKind::Rating,
                period: "Total".to_string(),
                reason: "coluna 'Avaliação' não encontrada".to_string(),
            }],
            summaries: vec![TicketSummary {
                label: "Total".to_string(),
                is_total: true,
                total: 10,
                rated: 4,
                without_catalog_item: 1,
                mean_response_minutes: None,
                mean_resolution_minutes: Some(95.0),
            }],
            top_catalog_items: vec![
                AggregateEntry::new("Impressora", 6),
                AggregateEntry::new("Rede", 3),
            ],
            duration_seconds: 1.5,
        }
    }

    #[test]
    fn test_generate_markdown_summary() {
        let markdown = generate_markdown_summary(&create_test_report());

        assert!(markdown.contains("# Relatório de Chamados"));
        assert!(markdown.contains("## Resumo por Período"));
        assert!(markdown.contains("| **Total** | 10 | 4 (40%) | 1 | - | 1h 35min |"));
        assert!(markdown.contains("1. Impressora (6)"));
        assert!(markdown.contains("`chamados_por_hora_janeiro.png`"));
        assert!(markdown.contains("### Janeiro"));
        assert!(markdown.contains("Avaliações (Total)"));
    }

    #[test]
    fn test_metadata_section_dropped_rows() {
        let mut report = create_test_report();
        let section = generate_metadata_section(&report);
        assert!(section.contains("Linhas descartadas (sem data de início):** 2"));

        report.dropped_rows = 0;
        let section = generate_metadata_section(&report);
        assert!(!section.contains("Linhas descartadas"));
    }

    #[test]
    fn test_only_the_whole_table_row_is_bold() {
        let summaries = vec![
            TicketSummary {
                label: "Total".to_string(),
                is_total: true,
                total: 3,
                ..Default::default()
            },
            TicketSummary {
                label: "Total".to_string(),
                total: 1,
                ..Default::default()
            },
        ];

        let section = generate_summary_section(&summaries);
        assert!(section.contains("| **Total** | 3 |"));
        assert!(section.contains("| Total | 1 |"));
        assert_eq!(section.matches("**Total**").count(), 1);
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        assert!(generate_catalog_section(&[]).is_empty());
        assert!(generate_skipped_section(&[]).is_empty());
        assert!(generate_charts_section(&[]).contains("Nenhum gráfico"));
    }
}
