//! # Schema Migrations
//!
//! A [`MigrationRegistry`] is a set of `from -> to` steps. Applying it walks
//! the chain starting at the stored version until the current schema version
//! is reached or no step starts at the version in hand.
//!
//! Stopping short is reported as [`FichaError::MigrationGap`] by the caller;
//! the registry itself only returns where it got to. The walk is bounded by
//! the number of registered steps, so a cyclic registry terminates.

use crate::error::{FichaError, Result};
use crate::model::{FormData, CURRENT_SCHEMA_VERSION};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use tracing::debug;

pub type MigrationTransformFn = fn(FormData) -> FormData;

#[derive(Debug, Clone)]
pub struct MigrationStep {
    pub from_version: String,
    pub to_version: String,
    pub description: String,
    pub transform: MigrationTransformFn,
}

impl MigrationStep {
    pub fn new(
        from_version: impl Into<String>,
        to_version: impl Into<String>,
        description: impl Into<String>,
        transform: MigrationTransformFn,
    ) -> Self {
        Self {
            from_version: from_version.into(),
            to_version: to_version.into(),
            description: description.into(),
            transform,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOutcome {
    pub payload: FormData,
    pub final_version: String,
    /// `"from -> to"` for every step that ran, in order.
    pub applied: Vec<String>,
}

impl MigrationOutcome {
    pub fn reached(&self, target: &str) -> bool {
        self.final_version == target
    }
}

#[derive(Debug, Clone)]
pub struct MigrationRegistry {
    current_version: String,
    steps: Vec<MigrationStep>,
}

/// The registry used unless a caller supplies its own.
pub static STANDARD_MIGRATIONS: Lazy<MigrationRegistry> = Lazy::new(|| {
    let mut registry = MigrationRegistry::new(CURRENT_SCHEMA_VERSION);
    registry.register(MigrationStep::new(
        "0.8",
        "0.9",
        "hoist sections out of the legacy `formulario` wrapper",
        hoist_formulario,
    ));
    registry.register(MigrationStep::new(
        "0.9",
        "1.0",
        "store free-text observations as {\"texto\": ...}",
        wrap_observacoes,
    ));
    registry
});

impl MigrationRegistry {
    pub fn new(current_version: impl Into<String>) -> Self {
        Self {
            current_version: current_version.into(),
            steps: Vec::new(),
        }
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Register a step. A later step with the same `from_version` is ignored.
    pub fn register(&mut self, step: MigrationStep) {
        self.steps.push(step);
    }

    pub fn needs_migration(&self, stored_version: &str) -> bool {
        stored_version != self.current_version
    }

    fn step_from(&self, version: &str) -> Option<&MigrationStep> {
        self.steps.iter().find(|s| s.from_version == version)
    }

    /// Applies steps from `stored_version` onwards. Never fails; check
    /// [`MigrationOutcome::reached`] against the current version.
    pub fn apply(&self, payload: FormData, stored_version: &str) -> MigrationOutcome {
        let mut payload = payload;
        let mut version = stored_version.to_string();
        let mut applied = Vec::new();

        for _ in 0..self.steps.len() {
            if version == self.current_version {
                break;
            }
            let Some(step) = self.step_from(&version) else {
                break;
            };
            debug!(
                from = %step.from_version,
                to = %step.to_version,
                description = %step.description,
                "applying migration"
            );
            payload = (step.transform)(payload);
            applied.push(format!("{} -> {}", step.from_version, step.to_version));
            version = step.to_version.clone();
        }

        MigrationOutcome {
            payload,
            final_version: version,
            applied,
        }
    }

    /// Like [`apply`](Self::apply) but fails when the chain stops short.
    pub fn migrate(&self, payload: FormData, stored_version: &str) -> Result<MigrationOutcome> {
        let outcome = self.apply(payload, stored_version);
        if !outcome.reached(&self.current_version) {
            return Err(FichaError::MigrationGap {
                from: stored_version.to_string(),
                reached: outcome.final_version,
                target: self.current_version.clone(),
            });
        }
        Ok(outcome)
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        STANDARD_MIGRATIONS.clone()
    }
}

fn hoist_formulario(mut payload: FormData) -> FormData {
    if let Some(Value::Object(inner)) = payload.remove_section("formulario") {
        for (name, value) in inner {
            if payload.section(&name).is_none() {
                payload.set_section(name, value);
            }
        }
    }
    payload
}

fn wrap_observacoes(mut payload: FormData) -> FormData {
    if let Some(Value::String(text)) = payload.section("observacoes").cloned() {
        payload.set_section("observacoes", json!({ "texto": text }));
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_marker(mut payload: FormData) -> FormData {
        let count = payload
            .section("marker")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        payload.set_section("marker", json!(count + 1));
        payload
    }

    #[test]
    fn test_current_version_needs_no_migration() {
        let registry = MigrationRegistry::default();
        assert!(!registry.needs_migration(CURRENT_SCHEMA_VERSION));
        assert!(registry.needs_migration("0.9"));
    }

    #[test]
    fn test_standard_chain_from_oldest_version() {
        let legacy = FormData::from_value(json!({
            "formulario": {
                "cliente": {"nome": "ACME"},
                "observacoes": "verificar painel"
            }
        }))
        .unwrap();

        let outcome = MigrationRegistry::default().migrate(legacy, "0.8").unwrap();

        assert_eq!(outcome.final_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(outcome.applied, vec!["0.8 -> 0.9", "0.9 -> 1.0"]);
        assert_eq!(outcome.payload.section("formulario"), None);
        assert_eq!(
            outcome.payload.section("cliente"),
            Some(&json!({"nome": "ACME"}))
        );
        assert_eq!(
            outcome.payload.section("observacoes"),
            Some(&json!({"texto": "verificar painel"}))
        );
    }

    #[test]
    fn test_hoist_does_not_overwrite_existing_sections() {
        let legacy = FormData::from_value(json!({
            "cliente": {"nome": "top"},
            "formulario": {"cliente": {"nome": "nested"}}
        }))
        .unwrap();
        let migrated = hoist_formulario(legacy);
        assert_eq!(migrated.section("cliente"), Some(&json!({"nome": "top"})));
    }

    #[test]
    fn test_migration_is_a_fixed_point() {
        let registry = MigrationRegistry::default();
        let outcome = registry
            .migrate(FormData::new().with_section("observacoes", json!("x")), "0.9")
            .unwrap();
        assert!(!registry.needs_migration(&outcome.final_version));

        let again = registry.apply(outcome.payload.clone(), &outcome.final_version);
        assert!(again.applied.is_empty());
        assert_eq!(again.payload, outcome.payload);
    }

    #[test]
    fn test_gap_is_reported() {
        let err = MigrationRegistry::default()
            .migrate(FormData::new(), "0.5")
            .unwrap_err();
        match err {
            FichaError::MigrationGap {
                from,
                reached,
                target,
            } => {
                assert_eq!(from, "0.5");
                assert_eq!(reached, "0.5");
                assert_eq!(target, CURRENT_SCHEMA_VERSION);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_partial_chain_stops_where_steps_end() {
        let mut registry = MigrationRegistry::new("3");
        registry.register(MigrationStep::new("1", "2", "one", add_marker));

        let outcome = registry.apply(FormData::new(), "1");
        assert_eq!(outcome.final_version, "2");
        assert!(!outcome.reached("3"));
        assert!(registry.migrate(FormData::new(), "1").is_err());
    }

    #[test]
    fn test_cyclic_registry_terminates() {
        let mut registry = MigrationRegistry::new("9");
        registry.register(MigrationStep::new("a", "b", "ab", add_marker));
        registry.register(MigrationStep::new("b", "a", "ba", add_marker));

        let outcome = registry.apply(FormData::new(), "a");
        assert_eq!(outcome.applied.len(), 2);
        assert_eq!(outcome.payload.section("marker"), Some(&json!(2)));
    }
}
