//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.ticketboard.toml` files. The resulting [`Config`] is passed explicitly
//! to the scanner, loader, assembler and server.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".ticketboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory settings.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Source column names.
    #[serde(default)]
    pub columns: ColumnsConfig,

    /// Report generation settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Web server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding one spreadsheet per period.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory the chart images are written to.
    #[serde(default = "default_graphs_dir")]
    pub graphs_dir: PathBuf,

    /// File name of the consolidated spreadsheet, written inside `data_dir`.
    #[serde(default = "default_consolidated_file")]
    pub consolidated_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            graphs_dir: default_graphs_dir(),
            consolidated_file: default_consolidated_file(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("dados_tiflux")
}

fn default_graphs_dir() -> PathBuf {
    PathBuf::from("graficos")
}

fn default_consolidated_file() -> String {
    "dados_anuais.xlsx".to_string()
}

/// Column names as they appear in the source spreadsheets.
///
/// Names may be given raw (`Item do Catálogo`) or already normalized
/// (`Item_do_Catálogo`); the loader normalizes both the same way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsConfig {
    #[serde(default = "default_started_at")]
    pub started_at: String,

    #[serde(default = "default_assumed_at")]
    pub assumed_at: String,

    #[serde(default = "default_updated_at")]
    pub updated_at: String,

    #[serde(default = "default_finished_at")]
    pub finished_at: String,

    #[serde(default = "default_catalog_item")]
    pub catalog_item: String,

    #[serde(default = "default_requester")]
    pub requester: String,

    #[serde(default = "default_rating")]
    pub rating: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            started_at: default_started_at(),
            assumed_at: default_assumed_at(),
            updated_at: default_updated_at(),
            finished_at: default_finished_at(),
            catalog_item: default_catalog_item(),
            requester: default_requester(),
            rating: default_rating(),
        }
    }
}

fn default_started_at() -> String {
    "Iniciado em".to_string()
}

fn default_assumed_at() -> String {
    "Assumido em".to_string()
}

fn default_updated_at() -> String {
    "Atualizado em".to_string()
}

fn default_finished_at() -> String {
    "Finalizado em".to_string()
}

fn default_catalog_item() -> String {
    "Item do Catálogo".to_string()
}

fn default_requester() -> String {
    "Cliente".to_string()
}

fn default_rating() -> String {
    "Avaliação".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Entries kept in ranked charts of the whole table.
    #[serde(default = "default_top_n_total")]
    pub top_n_total: usize,

    /// Entries kept in ranked charts of a single period.
    #[serde(default = "default_top_n_period")]
    pub top_n_period: usize,

    /// File name suffix of charts covering the whole table.
    #[serde(default = "default_total_suffix")]
    pub total_suffix: String,

    /// Spreadsheet extensions picked up from the data directory.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Chart image width in pixels.
    #[serde(default = "default_chart_width")]
    pub chart_width: u32,

    /// Chart image height in pixels.
    #[serde(default = "default_chart_height")]
    pub chart_height: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n_total: default_top_n_total(),
            top_n_period: default_top_n_period(),
            total_suffix: default_total_suffix(),
            extensions: default_extensions(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
        }
    }
}

fn default_top_n_total() -> usize {
    15
}

fn default_top_n_period() -> usize {
    10
}

fn default_total_suffix() -> String {
    "total".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["xlsx", "xls", "ods", "csv"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_chart_width() -> u32 {
    1600
}

fn default_chart_height() -> u32 {
    800
}

/// Web server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the dashboard listens on.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.data_dir {
            self.paths.data_dir = dir.clone();
        }
        if let Some(ref dir) = args.graphs_dir {
            self.paths.graphs_dir = dir.clone();
        }
        if let Some(n) = args.top_n_total {
            self.report.top_n_total = n;
        }
        if let Some(n) = args.top_n_period {
            self.report.top_n_period = n;
        }
        if let Some(ref bind) = args.bind {
            self.server.bind = bind.clone();
        }
    }

    /// Full path of the consolidated spreadsheet.
    pub fn consolidated_path(&self) -> PathBuf {
        self.paths.data_dir.join(&self.paths.consolidated_file)
    }

    /// Create the data and graphs directories if they don't exist yet.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.paths.data_dir, &self.paths.graphs_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.paths.consolidated_file, "dados_anuais.xlsx");
        assert_eq!(config.report.top_n_total, 15);
        assert_eq!(config.report.top_n_period, 10);
        assert_eq!(config.columns.catalog_item, "Item do Catálogo");
        assert!(config.report.extensions.contains(&"xlsx".to_string()));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[paths]
data_dir = "planilhas"
graphs_dir = "saida"

[columns]
requester = "Solicitante"

[report]
top_n_total = 20
extensions = ["csv"]
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.paths.data_dir, PathBuf::from("planilhas"));
        assert_eq!(config.paths.graphs_dir, PathBuf::from("saida"));
        assert_eq!(config.paths.consolidated_file, "dados_anuais.xlsx");
        assert_eq!(config.columns.requester, "Solicitante");
        assert_eq!(config.columns.started_at, "Iniciado em");
        assert_eq!(config.report.top_n_total, 20);
        assert_eq!(config.report.top_n_period, 10);
        assert_eq!(config.report.extensions, vec!["csv"]);
        assert_eq!(config.server.bind, "127.0.0.1:5000");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[paths]"));
        assert!(toml_str.contains("[columns]"));
        assert!(toml_str.contains("[report]"));
        assert!(toml_str.contains("[server]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.report.total_suffix, "total");
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.data_dir = temp_dir.path().join("dados");
        config.paths.graphs_dir = temp_dir.path().join("out").join("graficos");

        config.ensure_directories().unwrap();
        assert!(config.paths.data_dir.is_dir());
        assert!(config.paths.graphs_dir.is_dir());
        assert_eq!(
            config.consolidated_path(),
            temp_dir.path().join("dados").join("dados_anuais.xlsx")
        );
    }
}
