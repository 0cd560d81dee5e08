//! Chart rendering.
//!
//! The assembler hands every non-empty aggregate to a [`ChartRenderer`].
//! [`PlottersRenderer`] draws PNG bar and line charts with value labels.

use crate::models::{Aggregate, AggregateKind, PeriodFilter};
use anyhow::{ensure, Result};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

const BAR_COLOR: RGBColor = RGBColor(49, 130, 189);
const FONT: &str = "sans-serif";
const MAX_LABEL_CHARS: usize = 40;

/// How an aggregate is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartStyle {
    VerticalBars,
    HorizontalBars,
    Line,
}

impl ChartStyle {
    pub fn for_kind(kind: AggregateKind) -> Self {
        match kind {
            AggregateKind::CatalogItem | AggregateKind::Requester => ChartStyle::HorizontalBars,
            AggregateKind::Week => ChartStyle::Line,
            _ => ChartStyle::VerticalBars,
        }
    }
}

/// Everything needed to draw one chart.
#[derive(Debug, Clone)]
pub struct ChartSpec<'a> {
    pub title: String,
    pub category_label: &'static str,
    pub value_label: &'static str,
    pub style: ChartStyle,
    pub aggregate: &'a Aggregate,
}

impl<'a> ChartSpec<'a> {
    pub fn for_aggregate(aggregate: &'a Aggregate) -> Self {
        let kind = aggregate.kind;
        let base = if kind.is_ranked() {
            format!("Top {} {}", aggregate.len(), kind.title())
        } else {
            kind.title().to_string()
        };
        let title = match &aggregate.filter {
            PeriodFilter::All => format!("{} - Total", base),
            PeriodFilter::Period(p) => format!("{} - {}", base, p),
        };

        Self {
            title,
            category_label: kind.category_label(),
            value_label: "Quantidade de Chamados",
            style: ChartStyle::for_kind(kind),
            aggregate,
        }
    }
}

/// Renders a chart to an image file.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, chart: &ChartSpec<'_>, path: &Path) -> Result<()>;
}

/// PNG charts drawn with plotters.
#[derive(Debug, Clone)]
pub struct PlottersRenderer {
    width: u32,
    height: u32,
}

impl PlottersRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn draw_vertical_bars(&self, plot: &ChartSpec<'_>, path: &Path) -> Result<()> {
        let entries = &plot.aggregate.entries;
        let n = entries.len() as u32;
        let labels: Vec<String> = entries.iter().map(|e| truncate_label(&e.label)).collect();

        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&plot.title, (FONT, 32))
            .margin(20)
            .x_label_area_size(70)
            .y_label_area_size(70)
            .build_cartesian_2d((0u32..n).into_segmented(), 0u32..axis_max(plot.aggregate))?;

        let formatter = |v: &SegmentValue<u32>| match v {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(entries.len())
            .x_label_formatter(&formatter)
            .x_desc(plot.category_label)
            .y_desc(plot.value_label)
            .axis_desc_style((FONT, 18))
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(BAR_COLOR.filled())
                .margin(8)
                .data(
                    entries
                        .iter()
                        .enumerate()
                        .map(|(i, e)| (i as u32, e.count as u32)),
                ),
        )?;

        let value_style =
            TextStyle::from((FONT, 16).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
        chart.draw_series(
            entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.count > 0)
                .map(|(i, e)| {
                    Text::new(
                        e.count.to_string(),
                        (SegmentValue::CenterOf(i as u32), e.count as u32),
                        value_style.clone(),
                    )
                }),
        )?;

        root.present()?;
        Ok(())
    }

    fn draw_horizontal_bars(&self, plot: &ChartSpec<'_>, path: &Path) -> Result<()> {
        let entries = &plot.aggregate.entries;
        let n = entries.len() as u32;
        let labels: Vec<String> = entries.iter().map(|e| truncate_label(&e.label)).collect();
        let label_area = label_area_width(&labels);

        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&plot.title, (FONT, 32))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(label_area)
            .build_cartesian_2d(0u32..axis_max(plot.aggregate), (0u32..n).into_segmented())?;

        // the first (largest) entry goes on top
        let formatter = |v: &SegmentValue<u32>| match v {
            SegmentValue::CenterOf(i) => n
                .checked_sub(i + 1)
                .and_then(|rank| labels.get(rank as usize))
                .cloned()
                .unwrap_or_default(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(entries.len())
            .y_label_formatter(&formatter)
            .x_desc(plot.value_label)
            .y_desc(plot.category_label)
            .axis_desc_style((FONT, 18))
            .draw()?;

        chart.draw_series(
            Histogram::horizontal(&chart)
                .style(BAR_COLOR.filled())
                .margin(6)
                .data(
                    entries
                        .iter()
                        .enumerate()
                        .map(|(rank, e)| (n - 1 - rank as u32, e.count as u32)),
                ),
        )?;

        let value_style =
            TextStyle::from((FONT, 16).into_font()).pos(Pos::new(HPos::Left, VPos::Center));
        chart.draw_series(entries.iter().enumerate().map(|(rank, e)| {
            Text::new(
                format!(" {}", e.count),
                (e.count as u32, SegmentValue::CenterOf(n - 1 - rank as u32)),
                value_style.clone(),
            )
        }))?;

        root.present()?;
        Ok(())
    }

    fn draw_line(&self, plot: &ChartSpec<'_>, path: &Path) -> Result<()> {
        let entries = &plot.aggregate.entries;
        let n = entries.len() as u32;
        let labels: Vec<String> = entries.iter().map(|e| truncate_label(&e.label)).collect();

        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&plot.title, (FONT, 32))
            .margin(20)
            .x_label_area_size(70)
            .y_label_area_size(70)
            .build_cartesian_2d((0u32..n).into_segmented(), 0u32..axis_max(plot.aggregate))?;

        let formatter = |v: &SegmentValue<u32>| match v {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .x_labels(entries.len())
            .x_label_formatter(&formatter)
            .x_desc(plot.category_label)
            .y_desc(plot.value_label)
            .axis_desc_style((FONT, 18))
            .draw()?;

        let points: Vec<(SegmentValue<u32>, u32)> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (SegmentValue::CenterOf(i as u32), e.count as u32))
            .collect();

        chart.draw_series(LineSeries::new(points.clone(), BAR_COLOR.stroke_width(3)))?;
        chart.draw_series(
            points
                .iter()
                .map(|point| Circle::new(point.clone(), 5, BAR_COLOR.filled())),
        )?;

        let value_style =
            TextStyle::from((FONT, 16).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
        chart.draw_series(points.iter().map(|(x, y)| {
            Text::new(y.to_string(), (x.clone(), *y), value_style.clone())
        }))?;

        root.present()?;
        Ok(())
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(&self, chart: &ChartSpec<'_>, path: &Path) -> Result<()> {
        ensure!(
            !chart.aggregate.is_empty(),
            "nothing to draw for {}",
            chart.aggregate.kind
        );

        match chart.style {
            ChartStyle::VerticalBars => self.draw_vertical_bars(chart, path),
            ChartStyle::HorizontalBars => self.draw_horizontal_bars(chart, path),
            ChartStyle::Line => self.draw_line(chart, path),
        }
    }
}

/// Upper bound of the value axis, leaving room for the value labels.
fn axis_max(aggregate: &Aggregate) -> u32 {
    let max = aggregate.entries.iter().map(|e| e.count).max().unwrap_or(0) as u32;
    max + max / 8 + 1
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        label.to_string()
    } else {
        let cut: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
        format!("{}…", cut)
    }
}

fn label_area_width(labels: &[String]) -> u32 {
    let longest = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u32;
    (longest * 9 + 30).clamp(80, 420)
}
