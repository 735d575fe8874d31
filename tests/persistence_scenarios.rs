//! End-to-end persistence scenarios over the file-backed store.

use chrono::{Duration, TimeZone, Utc};
use ficha::clock::FixedClock;
use ficha::config::FichaConfig;
use ficha::error::FichaError;
use ficha::model::FormData;
use ficha::persistence::{CleanupOptions, LoadOptions, LoadOutcome, Persistence, SaveOptions};
use ficha::store::fs::FileKvStore;
use ficha::store::KvStore;
use serde_json::json;
use tempfile::TempDir;

fn open(dir: &TempDir) -> Persistence<FileKvStore, FixedClock> {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 4, 1, 10, 0, 0).unwrap());
    Persistence::with_clock(
        FileKvStore::new(dir.path().join("storage")),
        FichaConfig::default(),
        clock,
    )
}

fn form(cliente: &str) -> FormData {
    FormData::from_value(json!({
        "consultor": {"nome": "Ana"},
        "cliente": {"razaoSocial": cliente},
        "acionamentos": [{"tipo": "inversor", "potenciaCv": 15}]
    }))
    .unwrap()
}

#[test]
fn fresh_install_loads_empty_and_checks_clean() {
    let dir = TempDir::new().unwrap();
    let p = open(&dir);

    assert_eq!(p.load(LoadOptions::default()).unwrap(), LoadOutcome::Empty);
    let report = p.check_integrity();
    assert!(report.is_valid);
    assert_eq!(report.backup_count, 0);
}

#[test]
fn data_survives_reopening_the_store() {
    let dir = TempDir::new().unwrap();
    open(&dir)
        .save(&form("Fundição Leste"), SaveOptions::default())
        .unwrap();

    let reopened = open(&dir);
    let outcome = reopened.load(LoadOptions::default()).unwrap();
    assert_eq!(outcome.into_data(), Some(form("Fundição Leste")));
}

#[test]
fn backup_ring_keeps_the_five_newest() {
    let dir = TempDir::new().unwrap();
    let p = open(&dir);

    for i in 0..8 {
        p.save(&form(&format!("cliente {}", i)), SaveOptions::default())
            .unwrap();
        p.clock().advance(Duration::minutes(1));
    }

    let entries = p.backups().list().unwrap();
    assert_eq!(entries.len(), 5);
    assert!(entries.windows(2).all(|w| w[0].id < w[1].id));

    // Newest backup holds the form saved just before the live one
    let restored = p.restore_latest().unwrap();
    assert_eq!(restored.data, form("cliente 6"));
}

#[test]
fn corrupt_metadata_falls_back_to_backup() {
    let dir = TempDir::new().unwrap();
    let p = open(&dir);
    p.save(&form("antigo"), SaveOptions::default()).unwrap();
    p.save(&form("novo"), SaveOptions::default()).unwrap();

    p.store().set(&p.keys().metadata, "not json").unwrap();

    match p.load(LoadOptions::default()).unwrap() {
        LoadOutcome::Recovered { data, .. } => assert_eq!(data, form("antigo")),
        other => panic!("expected recovery, got {:?}", other),
    }
    // The promoted backup is now the live slot and loads cleanly
    assert!(matches!(
        p.load(LoadOptions::default()).unwrap(),
        LoadOutcome::Loaded { .. }
    ));
}

#[test]
fn restore_takes_a_safety_backup_first() {
    let dir = TempDir::new().unwrap();
    let p = open(&dir);
    p.save(&form("um"), SaveOptions::default()).unwrap();
    let second = p.save(&form("dois"), SaveOptions::default()).unwrap();
    let target = second.backup.unwrap();

    let restored = p.restore_backup(target.id).unwrap();
    let safety = restored.safety_backup.unwrap();

    let entries = p.backups().list().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries.last().unwrap().id, safety.id);
    assert_eq!(
        ficha::persistence::decode_entry(&safety).unwrap(),
        form("dois")
    );
}

#[test]
fn stale_data_is_reported_then_recovered() {
    let dir = TempDir::new().unwrap();
    let p = open(&dir);
    p.save(&form("velho"), SaveOptions::default()).unwrap();
    p.save(&form("atual"), SaveOptions::default()).unwrap();
    p.clock().advance(Duration::days(31));

    let report = p.check_integrity();
    assert!(report.issues.iter().any(|i| i.contains("31 days old")));

    let err = p
        .load(LoadOptions {
            fallback_to_backup: false,
            ..LoadOptions::default()
        })
        .unwrap_err();
    assert!(matches!(err, FichaError::StaleData { .. }));

    assert!(matches!(
        p.load(LoadOptions::default()).unwrap(),
        LoadOutcome::Recovered { .. }
    ));
}

#[test]
fn remove_all_leaves_no_files() {
    let dir = TempDir::new().unwrap();
    let p = open(&dir);
    p.analytics().init_session();
    p.save(&form("x"), SaveOptions::default()).unwrap();
    p.save(&form("y"), SaveOptions::default()).unwrap();

    p.cleanup(CleanupOptions {
        remove_all: true,
        ..CleanupOptions::default()
    })
    .unwrap();

    assert!(p.store().keys().unwrap().is_empty());
}

#[test]
fn analytics_log_stays_bounded() {
    let dir = TempDir::new().unwrap();
    let p = open(&dir);
    for _ in 0..120 {
        p.analytics().record_action("campo_editado", json!(null));
    }

    assert_eq!(p.analytics().actions().len(), 100);
    assert_eq!(p.analytics().report().unwrap().counters["campo_editado"], 120);
}
