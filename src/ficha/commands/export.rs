//! Export of the stored form as a self-describing JSON document.
//!
//! The output format is chosen by extension: paths ending in `.gz` are
//! gzip-compressed, anything else is written as pretty-printed JSON.

use crate::clock::Clock;
use crate::commands::{format_size, CmdMessage, CmdResult};
use crate::error::{FichaError, Result};
use crate::model::{FormData, Metadata, CURRENT_SCHEMA_VERSION};
use crate::persistence::{LoadOptions, Persistence};
use crate::store::KvStore;
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const EXPORT_FORMAT: &str = "ficha-tecnica";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub format: String,
    pub schema_version: String,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    pub data: FormData,
}

pub(crate) fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// The stored form wrapped for export, or `None` when nothing is stored.
pub fn build_document<S: KvStore, C: Clock>(
    persistence: &Persistence<S, C>,
) -> Result<Option<ExportDocument>> {
    let outcome = persistence.load(LoadOptions {
        update_analytics: false,
        ..LoadOptions::default()
    })?;
    let Some(data) = outcome.into_data() else {
        return Ok(None);
    };

    Ok(Some(ExportDocument {
        format: EXPORT_FORMAT.to_string(),
        schema_version: CURRENT_SCHEMA_VERSION.to_string(),
        exported_at: persistence.clock().now(),
        metadata: persistence.read_metadata().ok().flatten(),
        data,
    }))
}

pub fn write_document(path: &Path, document: &ExportDocument) -> Result<usize> {
    let json = serde_json::to_string_pretty(document)?;
    let file = File::create(path).map_err(FichaError::Io)?;

    if is_gzip_path(path) {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(json.as_bytes()).map_err(FichaError::Io)?;
        encoder.finish().map_err(FichaError::Io)?;
    } else {
        let mut file = file;
        file.write_all(json.as_bytes()).map_err(FichaError::Io)?;
    }
    Ok(json.len())
}

pub fn run<S: KvStore, C: Clock>(persistence: &Persistence<S, C>, path: &Path) -> Result<CmdResult> {
    let mut result = CmdResult::default();

    let Some(document) = build_document(persistence)? else {
        result.add_message(CmdMessage::warning("Nothing to export: no saved data."));
        return Ok(result);
    };

    let size = write_document(path, &document)?;
    persistence.analytics().record_action(
        "data_exported",
        json!({ "size": size, "gzip": is_gzip_path(path) }),
    );

    result.add_message(CmdMessage::success(format!(
        "Exported {} section(s) to {} ({}).",
        document.data.len(),
        path.display(),
        format_size(size)
    )));
    Ok(result.with_data(document.data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{form, persistence};
    use crate::persistence::SaveOptions;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_export_nothing() {
        let p = persistence();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");

        let result = run(&p, &path).unwrap();
        assert!(!path.exists());
        assert!(result.messages[0].content.contains("Nothing to export"));
    }

    #[test]
    fn test_export_plain_json() {
        let p = persistence();
        p.save(&form(), SaveOptions::default()).unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ficha.json");

        run(&p, &path).unwrap();

        let doc: ExportDocument =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc.format, EXPORT_FORMAT);
        assert_eq!(doc.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(doc.data, form());
        assert!(doc.metadata.is_some());
        assert_eq!(doc.exported_at, p.clock().now());
    }

    #[test]
    fn test_export_gzip() {
        let p = persistence();
        p.save(&form(), SaveOptions::default()).unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ficha.json.gz");

        run(&p, &path).unwrap();

        let mut text = String::new();
        GzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        let doc: ExportDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(doc.data, form());
    }

    #[test]
    fn test_export_records_analytics() {
        let p = persistence();
        p.save(&form(), SaveOptions::default()).unwrap();
        let dir = TempDir::new().unwrap();
        run(&p, &dir.path().join("a.json")).unwrap();

        let report = p.analytics().report().unwrap();
        assert_eq!(report.counters["data_exported"], 1);
        assert!(!report.counters.contains_key("data_loaded"));
    }
}
