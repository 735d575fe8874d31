//! # Command Layer
//!
//! Use-case logic on top of the persistence facade. Each command lives in its
//! own submodule and returns a structured [`CmdResult`]; none of them print,
//! prompt or exit. The CLI (or any other client) decides how to render the
//! result.
//!
//! Command tests run against `MemStore` with a `FixedClock`, so every branch
//! can be reached without touching the filesystem or waiting for time to pass.
//!
//! ## Command Modules
//!
//! - [`save`]: Store a form read from JSON
//! - [`load`]: Load the stored form (migrating or recovering as needed)
//! - [`export`]: Write the stored form to a JSON (or `.json.gz`) document
//! - [`import`]: Read a document or bare form and store it
//! - [`backups`]: List, restore and prune backups
//! - [`cleanup`]: Remove stored keys and prune aged backups
//! - [`doctor`]: Integrity report
//! - [`stats`]: Usage analytics report
//! - [`config`]: Show and change configuration

use crate::analytics::AnalyticsReport;
use crate::config::FichaConfig;
use crate::model::{BackupEntry, FormData};
use crate::persistence::IntegrityReport;
use serde::Serialize;
use std::path::PathBuf;

pub mod backups;
pub mod cleanup;
pub mod config;
pub mod doctor;
pub mod export;
pub mod import;
pub mod load;
pub mod save;
pub mod stats;

#[derive(Debug, Clone)]
pub struct FichaPaths {
    /// Holds `config.json`.
    pub data_dir: PathBuf,
    /// Root of the file-backed key-value store.
    pub storage_dir: PathBuf,
}

impl FichaPaths {
    pub fn new(data_dir: PathBuf) -> Self {
        let storage_dir = data_dir.join("storage");
        Self {
            data_dir,
            storage_dir,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub data: Option<FormData>,
    pub backups: Vec<BackupEntry>,
    pub integrity: Option<IntegrityReport>,
    pub analytics: Option<AnalyticsReport>,
    pub config: Option<FichaConfig>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_data(mut self, data: FormData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_backups(mut self, backups: Vec<BackupEntry>) -> Self {
        self.backups = backups;
        self
    }

    pub fn with_integrity(mut self, report: IntegrityReport) -> Self {
        self.integrity = Some(report);
        self
    }

    pub fn with_analytics(mut self, report: AnalyticsReport) -> Self {
        self.analytics = Some(report);
        self
    }

    pub fn with_config(mut self, config: FichaConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.level == MessageLevel::Error)
    }
}

/// Human-readable byte count used in messages.
pub(crate) fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
