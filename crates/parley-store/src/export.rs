//! CSV export of panel payloads.
//!
//! Produces the full result set as CSV bytes plus a sanitized filename.
//! Delivery (download, upload, attachment) is behind [`ExportSink`] so the
//! controller only ever produces bytes.

use std::path::PathBuf;

use tracing::info;

use parley_core::types::PanelPayload;

use crate::error::StoreError;

/// Receives generated export bytes. Implementations decide how the file
/// reaches the user.
pub trait ExportSink: Send + Sync {
    fn deliver(&self, bytes: &[u8], filename: &str) -> Result<(), StoreError>;
}

/// Writes exports into a directory on the local filesystem.
pub struct FileExportSink {
    dir: PathBuf,
}

impl FileExportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ExportSink for FileExportSink {
    fn deliver(&self, bytes: &[u8], filename: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), "Export written");
        Ok(())
    }
}

/// Render a payload's full result set as CSV.
///
/// Header row comes from the keys of the first row; every field is quoted
/// with internal quote characters doubled. All rows are exported, not the
/// capped inline preview.
pub fn payload_to_csv(payload: &PanelPayload) -> String {
    let Some(first) = payload.rows.first() else {
        return String::new();
    };

    let columns: Vec<&String> = first.keys().collect();
    let mut lines = Vec::with_capacity(payload.rows.len() + 1);
    lines.push(csv_line(columns.iter().map(|c| c.as_str())));

    for row in &payload.rows {
        lines.push(csv_line(
            columns.iter().map(|c| cell_text(row.get(c.as_str()))),
        ));
    }
    lines.join("\n")
}

/// Suggested filename for an export: the title stripped of everything but
/// alphanumerics, plus `.csv`.
pub fn export_filename(title: &str) -> String {
    let stem: String = title.chars().filter(|c| c.is_alphanumeric()).collect();
    if stem.is_empty() {
        "export.csv".to_string()
    } else {
        format!("{}.csv", stem)
    }
}

fn csv_line<I, S>(fields: I) -> String
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .map(|f| format!("\"{}\"", f.as_ref().replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

fn cell_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Convenience: render and deliver a payload through a sink.
pub fn export_payload(payload: &PanelPayload, sink: &dyn ExportSink) -> Result<(), StoreError> {
    let csv = payload_to_csv(payload);
    if csv.is_empty() {
        return Err(StoreError::Export("payload has no rows".to_string()));
    }
    sink.deliver(csv.as_bytes(), &export_filename(&payload.title))
}
