//! Core data types shared by every layer.
//!
//! The form payload ([`FormData`]) is deliberately schemaless: each section
//! maps to an arbitrary JSON value so that new form steps never require a
//! storage change. Everything wrapped around it (metadata, backups, the
//! compression envelope, analytics) is strongly typed and serialised with the
//! camelCase names used on disk.

use crate::error::{FichaError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Schema version written into every [`Metadata`]. Compared for exact equality.
pub const CURRENT_SCHEMA_VERSION: &str = "1.0";

/// The known sections of a technical specification sheet, in wizard order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Consultor,
    Cliente,
    Maquina,
    Acionamentos,
    Seguranca,
    Automacao,
    Infraestrutura,
    Observacoes,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::Consultor,
        Section::Cliente,
        Section::Maquina,
        Section::Acionamentos,
        Section::Seguranca,
        Section::Automacao,
        Section::Infraestrutura,
        Section::Observacoes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Consultor => "consultor",
            Section::Cliente => "cliente",
            Section::Maquina => "maquina",
            Section::Acionamentos => "acionamentos",
            Section::Seguranca => "seguranca",
            Section::Automacao => "automacao",
            Section::Infraestrutura => "infraestrutura",
            Section::Observacoes => "observacoes",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The whole form, keyed by section name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData {
    sections: BTreeMap<String, Value>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a payload from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                sections: map.into_iter().collect(),
            }),
            other => Err(FichaError::InvalidPayload(format!(
                "expected an object of sections, found {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.sections
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn with_section(mut self, name: impl Into<String>, value: Value) -> Self {
        self.sections.insert(name.into(), value);
        self
    }

    pub fn set_section(&mut self, name: impl Into<String>, value: Value) {
        self.sections.insert(name.into(), value);
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    pub fn known_section(&self, section: Section) -> Option<&Value> {
        self.sections.get(section.as_str())
    }

    pub fn remove_section(&mut self, name: &str) -> Option<Value> {
        self.sections.remove(name)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.sections.iter()
    }

    pub fn retain(&mut self, f: impl FnMut(&String, &mut Value) -> bool) {
        self.sections.retain(f);
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Envelope written next to every stored payload. Superseded, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub size: usize,
    pub checksum: String,
    pub compressed: bool,
    pub user_agent: String,
}

/// A snapshot of the live slot held in the backup ring.
///
/// `data` and `metadata` are kept exactly as they were stored so a restore
/// writes back byte-identical values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    /// Creation time in milliseconds since the epoch. Unique within a ring.
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub data: String,
    pub metadata: Option<String>,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub action: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRecord {
    pub session_id: String,
    pub first_access: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    pub sessions_count: u64,
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
    #[serde(default)]
    pub counters: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_data_from_object() {
        let data = FormData::from_value(json!({
            "cliente": {"razaoSocial": "ACME"},
            "acionamentos": [{"tipo": "motor"}]
        }))
        .unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(
            data.known_section(Section::Cliente),
            Some(&json!({"razaoSocial": "ACME"}))
        );
    }

    #[test]
    fn test_form_data_rejects_non_object() {
        let err = FormData::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, FichaError::InvalidPayload(_)));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_form_data_serializes_transparently() {
        let data = FormData::new().with_section("maquina", json!({"modelo": "X1"}));
        let text = serde_json::to_string(&data).unwrap();
        assert_eq!(text, r#"{"maquina":{"modelo":"X1"}}"#);
        assert_eq!(data.to_value(), json!({"maquina": {"modelo": "X1"}}));
    }

    #[test]
    fn test_section_names_roundtrip() {
        for section in Section::ALL {
            assert_eq!(Section::from_name(section.as_str()), Some(section));
        }
        assert_eq!(Section::from_name("fotos"), None);
    }

    #[test]
    fn test_metadata_uses_camel_case() {
        let meta = Metadata {
            version: CURRENT_SCHEMA_VERSION.to_string(),
            timestamp: Utc::now(),
            size: 10,
            checksum: "abc".to_string(),
            compressed: true,
            user_agent: "test".to_string(),
        };
        let value = serde_json::to_value(&meta).unwrap();
        assert!(value.get("userAgent").is_some());
        assert!(value.get("user_agent").is_none());
    }
}
