//! Consolidated spreadsheet output.
//!
//! The table is written as a single `.xlsx` worksheet: the union of the
//! source columns followed by the derived period, weekday and hour columns.
//! The file is built in a temp file next to the target and renamed over it.

use crate::models::{Cell, ConsolidatedTable, HOUR_COLUMN, PERIOD_COLUMN, WEEKDAY_COLUMN};
use anyhow::{ensure, Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Weekday};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::io::Write;
use std::path::Path;
use tracing::debug;

const SHEET_NAME: &str = "Consolidado";
const DATE_FORMAT: &str = "dd/mm/yyyy hh:mm";
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

/// Write the table to `path`, replacing any previous file.
pub fn write_consolidated(table: &ConsolidatedTable, path: &Path) -> Result<()> {
    let columns = table.columns();
    let total_columns = columns.len() + 3;
    ensure!(
        table.len() < MAX_ROWS,
        "{} rows exceed the worksheet limit",
        table.len()
    );
    ensure!(
        total_columns <= MAX_COLUMNS,
        "{} columns exceed the worksheet limit",
        total_columns
    );

    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let headers = columns
        .iter()
        .map(String::as_str)
        .chain([PERIOD_COLUMN, WEEKDAY_COLUMN, HOUR_COLUMN]);
    for (col, name) in headers.enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, &header_format)?;
    }

    let period_col = columns.len() as u16;
    for (i, record) in table.records().iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, name) in columns.iter().enumerate() {
            if let Some(cell) = record.fields.get(name) {
                write_cell(worksheet, row, col as u16, cell, &date_format)?;
            }
        }
        worksheet.write_string(row, period_col, &record.period)?;
        worksheet.write_string(row, period_col + 1, day_name(record.weekday()))?;
        worksheet.write_number(row, period_col + 2, record.hour())?;
    }

    let buffer = workbook
        .save_to_buffer()
        .context("Failed to serialize consolidated workbook")?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".consolidado")
        .suffix(".xlsx.tmp")
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(&buffer)?;
    tmp.flush()?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    debug!(
        "Wrote {} rows x {} columns to {}",
        table.len(),
        total_columns,
        path.display()
    );
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    date_format: &Format,
) -> Result<()> {
    match cell {
        Cell::Empty => {}
        Cell::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        Cell::Number(n) => {
            worksheet.write_number(row, col, *n)?;
        }
        Cell::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        Cell::DateTime(dt) => {
            worksheet.write_number_with_format(row, col, excel_serial(dt), date_format)?;
        }
    }
    Ok(())
}

/// Days since 1899-12-30, as Excel stores dates.
fn excel_serial(dt: &NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    (*dt - epoch).num_seconds() as f64 / 86_400.0
}

/// Full English day name, as written to the weekday column.
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
