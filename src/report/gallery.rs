//! Listing of the generated chart images, grouped by kind.

use crate::models::AggregateKind;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Chart images in `graphs_dir`, keyed by kind file stem, names sorted.
///
/// Kinds without images are left out. A missing directory yields an empty map.
pub fn list_charts(graphs_dir: &Path) -> BTreeMap<String, Vec<String>> {
    let mut charts: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for name in png_names(graphs_dir) {
        if let Some(kind) = kind_of(&name) {
            charts.entry(kind.file_stem().to_string()).or_default().push(name);
        }
    }

    for names in charts.values_mut() {
        names.sort();
    }
    charts
}

/// Paths of the chart images in `graphs_dir`, other PNG files left out.
pub fn chart_paths(graphs_dir: &Path) -> Vec<PathBuf> {
    png_names(graphs_dir)
        .into_iter()
        .filter(|name| kind_of(name).is_some())
        .map(|name| graphs_dir.join(name))
        .collect()
}

/// Modification time of the newest chart image.
pub fn last_updated(graphs_dir: &Path) -> Option<DateTime<Utc>> {
    WalkDir::new(graphs_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| is_png(e.path()))
        .filter_map(|e| e.metadata().ok()?.modified().ok())
        .max()
        .map(DateTime::<Utc>::from)
}

/// Kind a chart file belongs to, from its `<stem>_` prefix.
pub fn kind_of(file_name: &str) -> Option<AggregateKind> {
    AggregateKind::ALL
        .into_iter()
        .find(|kind| file_name.starts_with(&format!("{}_", kind.file_stem())))
}

fn png_names(dir: &Path) -> Vec<String> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_png(e.path()))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect()
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("png"))
        .unwrap_or(false)
}
