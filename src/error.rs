//! Error types for loading and report generation.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to read a single source spreadsheet.
///
/// These are recovered by the loader: the file is skipped with a warning.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook has no worksheets")]
    NoWorksheet,

    #[error("sheet has no header row")]
    MissingHeader,

    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error("missing required column '{0}'")]
    MissingColumn(String),
}

/// Failure of the whole load step.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("data directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("no valid data found in {}", .0.display())]
    NoValidData(PathBuf),

    #[error("scanning data directory failed: {0}")]
    Scan(anyhow::Error),
}

/// Failure of one generation run, tagged with the step that failed.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("loading source spreadsheets failed: {0}")]
    Load(#[from] LoadError),

    #[error("preparing output directory {} failed: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("saving consolidated file {} failed: {source}", path.display())]
    Persist {
        path: PathBuf,
        source: anyhow::Error,
    },

    #[error("rendering chart {} failed: {source}", path.display())]
    Render {
        path: PathBuf,
        source: anyhow::Error,
    },

    #[error("writing summary {} failed: {source}", path.display())]
    Summary {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ReportError {
    /// Short name of the step that failed, used in run traces.
    pub fn step(&self) -> &'static str {
        match self {
            ReportError::Load(_) => "load",
            ReportError::OutputDir { .. } => "prepare",
            ReportError::Persist { .. } => "persist",
            ReportError::Render { .. } => "render",
            ReportError::Summary { .. } => "summary",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_error_step_names() {
        let err = ReportError::from(LoadError::NoValidData(PathBuf::from("dados")));
        assert_eq!(err.step(), "load");
        assert!(err.to_string().contains("no valid data found in dados"));

        let err = ReportError::Render {
            path: PathBuf::from("graficos/chamados_por_hora_total.png"),
            source: anyhow::anyhow!("disk full"),
        };
        assert_eq!(err.step(), "render");
        assert!(err.to_string().contains("disk full"));
    }
}
