//! Record loading and consolidation.
//!
//! Every period spreadsheet in the data directory is read, its column names
//! normalized, its date columns parsed day-first and its rows tagged with the
//! period label derived from the file name. The rows of all files are merged
//! into one [`ConsolidatedTable`].

pub mod sheet;

use crate::config::{ColumnsConfig, Config};
use crate::error::{LoadError, SheetError};
use crate::models::{Cell, ConsolidatedTable, SourceSummary, TicketRecord};
use crate::scanner::{FileScanner, ScanConfig, ScannedFile};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// `%Y` also accepts two digits, so the two-digit-year formats come first.
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%y %H:%M:%S",
    "%d/%m/%y %H:%M",
    "%d-%m-%y %H:%M:%S",
    "%d-%m-%y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMATS: &[&str] = &["%d/%m/%y", "%d-%m-%y", "%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

/// Largest serial date Excel accepts (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Normalized names of the columns the loader interprets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub started_at: String,
    pub assumed_at: String,
    pub updated_at: String,
    pub finished_at: String,
    pub catalog_item: String,
    pub requester: String,
    pub rating: String,
}

impl ColumnNames {
    fn date_columns(&self) -> [&str; 4] {
        [
            self.started_at.as_str(),
            self.assumed_at.as_str(),
            self.updated_at.as_str(),
            self.finished_at.as_str(),
        ]
    }
}

impl From<&ColumnsConfig> for ColumnNames {
    fn from(columns: &ColumnsConfig) -> Self {
        Self {
            started_at: normalize_column_name(&columns.started_at),
            assumed_at: normalize_column_name(&columns.assumed_at),
            updated_at: normalize_column_name(&columns.updated_at),
            finished_at: normalize_column_name(&columns.finished_at),
            catalog_item: normalize_column_name(&columns.catalog_item),
            requester: normalize_column_name(&columns.requester),
            rating: normalize_column_name(&columns.rating),
        }
    }
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self::from(&ColumnsConfig::default())
    }
}

/// Rows of one source file after normalization.
struct LoadedFile {
    columns: Vec<String>,
    records: Vec<TicketRecord>,
    summary: SourceSummary,
}

/// Loads and consolidates every period spreadsheet of a directory.
pub struct RecordLoader {
    data_dir: PathBuf,
    scan_config: ScanConfig,
    columns: ColumnNames,
}

impl RecordLoader {
    pub fn new(data_dir: PathBuf, scan_config: ScanConfig, columns: ColumnNames) -> Self {
        Self {
            data_dir,
            scan_config,
            columns,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.paths.data_dir.clone(),
            ScanConfig::from(config),
            ColumnNames::from(&config.columns),
        )
    }

    pub fn columns(&self) -> &ColumnNames {
        &self.columns
    }

    /// Source files this loader would read.
    pub fn source_files(&self) -> Result<Vec<ScannedFile>, LoadError> {
        if !self.data_dir.is_dir() {
            return Err(LoadError::MissingDirectory(self.data_dir.clone()));
        }
        FileScanner::new(self.data_dir.clone(), self.scan_config.clone())
            .scan()
            .map_err(LoadError::Scan)
    }

    /// Build the consolidated table.
    ///
    /// Files that cannot be parsed are skipped with a warning. Fails only
    /// when no file yields a single row with a usable start time.
    pub fn load(&self) -> Result<ConsolidatedTable, LoadError> {
        let files = self.source_files()?;
        info!(
            "Found {} source spreadsheet(s) in {}",
            files.len(),
            self.data_dir.display()
        );

        let mut columns: Vec<String> = Vec::new();
        let mut records = Vec::new();
        let mut sources = Vec::new();

        for file in &files {
            match self.load_file(&file.path) {
                Ok(loaded) => {
                    debug!(
                        "Loaded {} ({}): {} of {} rows kept",
                        file.path.display(),
                        loaded.summary.period,
                        loaded.summary.rows_kept,
                        loaded.summary.rows_read
                    );
                    for column in loaded.columns {
                        if !columns.contains(&column) {
                            columns.push(column);
                        }
                    }
                    records.extend(loaded.records);
                    sources.push(loaded.summary);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", file.path.display(), e);
                }
            }
        }

        let table = ConsolidatedTable::new(columns, records, sources);
        if table.is_empty() {
            return Err(LoadError::NoValidData(self.data_dir.clone()));
        }
        info!(
            "Consolidated {} rows from {} file(s), {} dropped without start time",
            table.len(),
            table.sources().len(),
            table.dropped_rows()
        );
        Ok(table)
    }

    fn load_file(&self, path: &Path) -> Result<LoadedFile, SheetError> {
        let sheet = sheet::read_sheet(path)?;
        let columns = normalize_headers(&sheet.headers);

        if !columns.contains(&self.columns.started_at) {
            return Err(SheetError::MissingColumn(self.columns.started_at.clone()));
        }

        let period = period_label(path);
        let date_columns = self.columns.date_columns();
        let rows_read = sheet.rows.len();
        let mut records = Vec::with_capacity(rows_read);

        for row in sheet.rows {
            let mut fields = BTreeMap::new();
            for (name, cell) in columns.iter().zip(row) {
                let cell = if date_columns.contains(&name.as_str()) {
                    parse_datetime(&cell).map_or(Cell::Empty, Cell::DateTime)
                } else {
                    cell
                };
                if !cell.is_missing() {
                    fields.insert(name.clone(), cell);
                }
            }

            let started_at = match datetime_field(&fields, &self.columns.started_at) {
                Some(dt) => dt,
                None => continue,
            };

            records.push(TicketRecord {
                started_at,
                assumed_at: datetime_field(&fields, &self.columns.assumed_at),
                finished_at: datetime_field(&fields, &self.columns.finished_at),
                catalog_item: label_field(&fields, &self.columns.catalog_item),
                requester: label_field(&fields, &self.columns.requester),
                rating: label_field(&fields, &self.columns.rating),
                period: period.clone(),
                fields,
            });
        }

        let summary = SourceSummary {
            path: path.to_path_buf(),
            period,
            rows_read,
            rows_kept: records.len(),
        };

        Ok(LoadedFile {
            columns,
            records,
            summary,
        })
    }
}

fn datetime_field(fields: &BTreeMap<String, Cell>, name: &str) -> Option<NaiveDateTime> {
    match fields.get(name) {
        Some(Cell::DateTime(dt)) => Some(*dt),
        _ => None,
    }
}

fn label_field(fields: &BTreeMap<String, Cell>, name: &str) -> Option<String> {
    fields.get(name).and_then(Cell::as_label)
}

/// Normalize a column name: trim, spaces to `_`, parentheses removed.
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != '(' && *c != ')')
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Normalize a header row, suffixing repeated names with `.1`, `.2`, ...
fn normalize_headers(headers: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(headers.len());
    for header in headers {
        let base = normalize_column_name(header);
        let mut name = base.clone();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        seen.push(name);
    }
    seen
}

/// Period label of a source file: its stem, capitalized.
pub fn period_label(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    capitalize(stem.trim())
}

/// Uppercase the first character and lowercase the rest.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Parse a cell as a date-time, day-first. Unparseable values yield `None`.
pub fn parse_datetime(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::DateTime(dt) => Some(*dt),
        Cell::Number(n) => excel_serial_to_datetime(*n),
        Cell::Text(s) => parse_datetime_text(s.trim()),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

fn parse_datetime_text(value: &str) -> Option<NaiveDateTime> {
    if value.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Convert an Excel serial date (days since 1899-12-30) to a date-time.
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::seconds(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    fn loader(dir: &Path) -> RecordLoader {
        RecordLoader::new(dir.to_path_buf(), ScanConfig::default(), ColumnNames::default())
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("  Item do Catálogo "), "Item_do_Catálogo");
        assert_eq!(normalize_column_name("Tempo (min)"), "Tempo_min");
        assert_eq!(normalize_column_name("Iniciado_em"), "Iniciado_em");
        assert_eq!(normalize_column_name("Avaliação"), "Avaliação");
    }

    #[test]
    fn test_normalize_headers_dedupes() {
        let headers = vec![
            "Cliente".to_string(),
            "Cliente ".to_string(),
            "Cliente".to_string(),
        ];
        assert_eq!(
            normalize_headers(&headers),
            vec!["Cliente", "Cliente.1", "Cliente.2"]
        );
    }

    #[test]
    fn test_period_label() {
        assert_eq!(period_label(Path::new("dados/janeiro.xlsx")), "Janeiro");
        assert_eq!(period_label(Path::new("MARÇO.csv")), "Março");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_parse_datetime_day_first() {
        let dt = parse_datetime(&Cell::Text("03/04/2024 08:45".to_string())).unwrap();
        assert_eq!((dt.day(), dt.month(), dt.year()), (3, 4, 2024));
        assert_eq!((dt.hour(), dt.minute()), (8, 45));

        let dt = parse_datetime(&Cell::Text("2024-04-03 08:45:10".to_string())).unwrap();
        assert_eq!((dt.day(), dt.month()), (3, 4));

        let dt = parse_datetime(&Cell::Text("03/04/2024".to_string())).unwrap();
        assert_eq!(dt.hour(), 0);

        assert_eq!(parse_datetime(&Cell::Text("ontem".to_string())), None);
        assert_eq!(parse_datetime(&Cell::Text("31/02/2024 10:00".to_string())), None);
        assert_eq!(parse_datetime(&Cell::Empty), None);
    }

    #[test]
    fn test_parse_datetime_two_digit_year() {
        let dt = parse_datetime(&Cell::Text("03/04/24 08:45".to_string())).unwrap();
        assert_eq!((dt.day(), dt.month(), dt.year()), (3, 4, 2024));
        assert_eq!(dt.weekday(), chrono::Weekday::Wed);

        let dt = parse_datetime(&Cell::Text("03-04-24".to_string())).unwrap();
        assert_eq!(dt.year(), 2024);

        // Four-digit years still win over the two-digit formats.
        let dt = parse_datetime(&Cell::Text("03/04/2024 08:45:30".to_string())).unwrap();
        assert_eq!((dt.year(), dt.second()), (2024, 30));
    }

    #[test]
    fn test_parse_excel_serial() {
        // 45292.5 = 2024-01-01 12:00
        let dt = parse_datetime(&Cell::Number(45292.5)).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2024, 1, 1, 12));
        assert_eq!(parse_datetime(&Cell::Number(-3.0)), None);
    }

    #[test]
    fn test_load_merges_files_and_drops_bad_dates() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write(
            dir,
            "janeiro.csv",
            "Iniciado em;Item do Catálogo;Cliente\n\
             15/01/2024 09:10;Impressora;ACME\n\
             16/01/2024 14:20;Rede;Beta\n\
             data inválida;Rede;ACME\n",
        );
        write(
            dir,
            "fevereiro.csv",
            "Iniciado em;Item do Catálogo;Avaliação\n\
             05/02/2024 10:00;;5\n\
             06/02/2024 11:30;Email;4\n",
        );

        let table = loader(dir).load().unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.dropped_rows(), 1);
        // files are read in name order
        assert_eq!(table.periods(), vec!["Fevereiro", "Janeiro"]);
        assert_eq!(
            table.columns(),
            &["Iniciado_em", "Item_do_Catálogo", "Avaliação", "Cliente"]
        );

        let fevereiro = &table.records()[0];
        assert_eq!(fevereiro.catalog_item, None);
        assert_eq!(fevereiro.rating.as_deref(), Some("5"));
        assert_eq!(fevereiro.requester, None);
        assert!(matches!(
            fevereiro.fields.get("Iniciado_em"),
            Some(Cell::DateTime(_))
        ));

        let janeiro = &table.records()[2];
        assert_eq!(janeiro.period, "Janeiro");
        assert_eq!(janeiro.requester.as_deref(), Some("ACME"));
        assert_eq!(janeiro.hour(), 9);
    }

    #[test]
    fn test_load_skips_unparseable_and_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write(dir, "abril.xlsx", "definitely not a workbook");
        write(dir, "maio.csv", "Coluna A;Coluna B\n1;2\n");
        write(dir, "junho.csv", "Iniciado em\n10/06/2024 08:00\n");

        let table = loader(dir).load().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.sources().len(), 1);
        assert_eq!(table.periods(), vec!["Junho"]);
    }

    #[test]
    fn test_load_without_valid_rows_fails() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write(dir, "janeiro.csv", "Iniciado em\nsem data\n");

        let err = loader(dir).load().unwrap_err();
        assert!(matches!(err, LoadError::NoValidData(_)));

        let empty = TempDir::new().unwrap();
        assert!(matches!(
            loader(empty.path()).load().unwrap_err(),
            LoadError::NoValidData(_)
        ));
    }

    #[test]
    fn test_load_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let err = loader(&temp_dir.path().join("nope")).load().unwrap_err();
        assert!(matches!(err, LoadError::MissingDirectory(_)));
    }

    #[test]
    fn test_configured_columns_are_normalized() {
        let temp_dir = TempDir::new().unwrap();
        write(
            temp_dir.path(),
            "marco.csv",
            "Data de Abertura;Solicitante\n01/03/2024 07:00;Carla\n",
        );

        let columns = ColumnsConfig {
            started_at: "Data de Abertura".to_string(),
            requester: "Solicitante".to_string(),
            ..ColumnsConfig::default()
        };
        let loader = RecordLoader::new(
            temp_dir.path().to_path_buf(),
            ScanConfig::default(),
            ColumnNames::from(&columns),
        );
        assert_eq!(loader.columns().started_at, "Data_de_Abertura");

        let table = loader.load().unwrap();
        assert_eq!(table.records()[0].requester.as_deref(), Some("Carla"));
    }
}
