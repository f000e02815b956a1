// Export of stored results as JSON, CSV or plain text

use crate::error::{CoreError, Result};
use jsner_scanner::result::{Category, ResultSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Bucket order of the bundle export, which differs from the single-format one
const BUNDLE_ORDER: [Category; 5] = [
    Category::Endpoint,
    Category::Api,
    Category::Graphql,
    Category::Config,
    Category::Other,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Text,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Json, ExportFormat::Csv, ExportFormat::Text];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            "txt" | "text" => Some(ExportFormat::Text),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Text => "txt",
        }
    }

    pub fn default_filename(&self) -> String {
        format!("jsner-endpoints.{}", self.extension())
    }

    pub fn bundle_filename(&self) -> String {
        format!("jsner-results.{}", self.extension())
    }
}

/// Render results in `format`. Fails with `ExportEmpty` when no bucket holds anything.
pub fn export_results(results: &ResultSet, format: ExportFormat) -> Result<String> {
    if results.is_empty() {
        return Err(CoreError::ExportEmpty);
    }

    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(results)?),
        ExportFormat::Csv => Ok(generate_csv(results)),
        ExportFormat::Text => Ok(results
            .all_candidates()
            .map(|(_, value)| value.as_str())
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// Row type for values that no labelled bucket holds
const UNKNOWN_LABEL: &str = "unknown";

/// `Type,Value` rows for every bucket entry; the type is the first of endpoint, graphql,
/// api and config holding the value, else `unknown`.
pub fn generate_csv(results: &ResultSet) -> String {
    let rows = results.all_candidates().map(|(_, value)| {
        let label = results
            .category_of(value)
            .map(|c| c.as_str())
            .unwrap_or(UNKNOWN_LABEL);
        csv_row(label, value)
    });
    csv_document(rows)
}

/// Bundle CSV: each row labelled with the bucket it was read from
pub fn generate_bundle_csv(results: &ResultSet) -> String {
    let rows = bundle_entries(results).map(|(category, value)| csv_row(category.as_str(), value));
    csv_document(rows)
}

fn bundle_entries(results: &ResultSet) -> impl Iterator<Item = (Category, &String)> {
    BUNDLE_ORDER
        .into_iter()
        .flat_map(move |c| results.bucket(c).iter().map(move |v| (c, v)))
}

fn csv_row(label: &str, value: &str) -> String {
    format!("{},\"{}\"", label, value.replace('"', "\"\""))
}

fn csv_document(rows: impl Iterator<Item = String>) -> String {
    let mut out = String::from("Type,Value");
    for row in rows {
        out.push('\n');
        out.push_str(&row);
    }
    out
}

pub fn save_export(content: &str, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Render and write one format; `path` defaults to the format's file name in the working directory.
pub fn write_export(
    results: &ResultSet,
    format: ExportFormat,
    path: Option<&Path>,
) -> Result<PathBuf> {
    let content = export_results(results, format)?;
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format.default_filename()));
    save_export(&content, &path)?;
    info!("Exported {} to {}", format.extension(), path.display());
    Ok(path)
}

/// Write `jsner-results.{json,csv,txt}` into `dir`, creating it if needed
pub fn write_bundle(results: &ResultSet, dir: &Path) -> Result<Vec<PathBuf>> {
    if results.is_empty() {
        return Err(CoreError::ExportEmpty);
    }
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(ExportFormat::ALL.len());
    for format in ExportFormat::ALL {
        let content = match format {
            ExportFormat::Json => serde_json::to_string_pretty(results)?,
            ExportFormat::Csv => generate_bundle_csv(results),
            ExportFormat::Text => bundle_entries(results)
                .map(|(_, value)| value.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        };
        let path = dir.join(format.bundle_filename());
        save_export(&content, &path)?;
        written.push(path);
    }

    info!("Exported bundle to {}", dir.display());
    Ok(written)
}
