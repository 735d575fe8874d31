//! Import of a form from disk.
//!
//! Accepts either an [`ExportDocument`] or a bare object of sections, plain or
//! gzip-compressed. Documents stamped with an older schema version are
//! migrated first. Empty sections are dropped before saving.

use super::export::{is_gzip_path, ExportDocument, EXPORT_FORMAT};
use crate::clock::Clock;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{FichaError, Result};
use crate::model::{FormData, CURRENT_SCHEMA_VERSION};
use crate::persistence::Persistence;
use crate::sanitize::strip_empty_sections;
use crate::store::KvStore;
use flate2::read::GzDecoder;
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

/// A parsed import file, before sanitising.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedForm {
    pub data: FormData,
    pub schema_version: String,
}

pub fn read_source(path: &Path) -> Result<String> {
    if is_gzip_path(path) {
        let mut text = String::new();
        GzDecoder::new(File::open(path).map_err(FichaError::Io)?)
            .read_to_string(&mut text)
            .map_err(FichaError::Io)?;
        Ok(text)
    } else {
        fs::read_to_string(path).map_err(FichaError::Io)
    }
}

pub fn parse(text: &str) -> Result<ImportedForm> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| FichaError::InvalidPayload(format!("not valid JSON: {}", e)))?;

    let is_document = value.get("format").and_then(Value::as_str) == Some(EXPORT_FORMAT);
    if is_document {
        let document: ExportDocument = serde_json::from_value(value)
            .map_err(|e| FichaError::InvalidPayload(format!("malformed export: {}", e)))?;
        return Ok(ImportedForm {
            data: document.data,
            schema_version: document.schema_version,
        });
    }

    Ok(ImportedForm {
        data: FormData::from_value(value)?,
        schema_version: CURRENT_SCHEMA_VERSION.to_string(),
    })
}

pub fn run<S: KvStore, C: Clock>(persistence: &Persistence<S, C>, path: &Path) -> Result<CmdResult> {
    let imported = parse(&read_source(path)?)?;
    let mut result = CmdResult::default();

    let migrations = persistence.migrations();
    let mut data = if migrations.needs_migration(&imported.schema_version) {
        let outcome = migrations.migrate(imported.data, &imported.schema_version)?;
        result.add_message(CmdMessage::info(format!(
            "Migrated imported data from version {}.",
            imported.schema_version
        )));
        outcome.payload
    } else {
        imported.data
    };

    let dropped = strip_empty_sections(&mut data);
    if data.is_empty() {
        return Err(FichaError::InvalidPayload(
            "the file has no filled-in sections".to_string(),
        ));
    }
    if !dropped.is_empty() {
        result.add_message(CmdMessage::info(format!(
            "Skipped empty section(s): {}.",
            dropped.join(", ")
        )));
    }

    let report = persistence.save(&data, persistence.default_save_options())?;
    persistence.analytics().record_action(
        "data_imported",
        json!({ "sections": data.len(), "skipped": dropped.len() }),
    );

    result.add_message(CmdMessage::success(format!(
        "Imported {} section(s) from {}.",
        data.len(),
        path.display()
    )));
    if let Some(backup) = report.backup {
        result.add_message(CmdMessage::info(format!(
            "Previous data kept as backup {}.",
            backup.id
        )));
    }

    Ok(result.with_data(data))
}
