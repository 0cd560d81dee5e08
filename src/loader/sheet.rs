//! Raw spreadsheet reading.
//!
//! Workbooks (`xlsx`, `xls`, `ods`) are read with calamine, first worksheet
//! only; CSV exports are `;`-separated. Both come out as a header row plus
//! typed cells, with no interpretation of the columns yet.

use crate::error::SheetError;
use crate::models::Cell;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDateTime, Timelike};
use std::path::Path;

/// A parsed sheet: header names and rows padded to the header width.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawSheet {
    /// Builds a sheet, padding or trimming every row to the header width and
    /// dropping rows with no values at all.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .filter(|row| row.iter().any(|c| !c.is_missing()))
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self { headers, rows }
    }
}

/// Read any supported spreadsheet, dispatching on the extension.
pub fn read_sheet(path: &Path) -> Result<RawSheet, SheetError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xlsm" | "xls" | "ods" => read_workbook(path),
        other => Err(SheetError::UnsupportedExtension(other.to_string())),
    }
}

/// Read the first worksheet of a workbook.
pub fn read_workbook(path: &Path) -> Result<RawSheet, SheetError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::NoWorksheet)??;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or(SheetError::MissingHeader)?;
    let headers = header_names(header_row.iter().map(cell_from_data));

    let body = rows
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    Ok(RawSheet::new(headers, body))
}

/// Read a `;`-separated CSV export. Invalid UTF-8 is replaced, not rejected.
pub fn read_csv(path: &Path) -> Result<RawSheet, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .has_headers(true)
        .from_path(path)?;

    let header_record = reader.byte_headers()?.clone();
    if header_record.is_empty() {
        return Err(SheetError::MissingHeader);
    }
    let headers = header_names(header_record.iter().enumerate().map(|(i, raw)| {
        let text = String::from_utf8_lossy(raw);
        // BOM
        let text = if i == 0 {
            text.trim_start_matches('\u{feff}').to_string()
        } else {
            text.into_owned()
        };
        text_cell(&text)
    }));

    let mut body = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        body.push(
            record
                .iter()
                .map(|raw| text_cell(&String::from_utf8_lossy(raw)))
                .collect(),
        );
    }

    Ok(RawSheet::new(headers, body))
}

fn header_names(cells: impl Iterator<Item = Cell>) -> Vec<String> {
    cells
        .enumerate()
        .map(|(i, cell)| cell.as_label().unwrap_or_else(|| format!("Unnamed {}", i)))
        .collect()
}

fn text_cell(value: &str) -> Cell {
    if value.trim().is_empty() {
        Cell::Empty
    } else {
        Cell::Text(value.to_string())
    }
}

/// Serial dates carry float noise; `10:00` may come back as `09:59:59.999`.
fn round_to_second(dt: NaiveDateTime) -> NaiveDateTime {
    (dt + Duration::milliseconds(500))
        .with_nanosecond(0)
        .unwrap_or(dt)
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => text_cell(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => Cell::DateTime(round_to_second(value)),
            None => Cell::Empty,
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => text_cell(s),
        Data::Error(_) => Cell::Empty,
    }
}
