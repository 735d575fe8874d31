use crate::clock::Clock;
use crate::commands::{format_size, CmdMessage, CmdResult};
use crate::error::Result;
use crate::persistence::{Persistence, RestoredBackup};
use crate::store::KvStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupAction {
    List,
    Restore(i64),
    RestoreLatest,
    /// Drop backups older than the given number of days.
    Prune(i64),
}

pub fn run<S: KvStore, C: Clock>(
    persistence: &Persistence<S, C>,
    action: BackupAction,
) -> Result<CmdResult> {
    match action {
        BackupAction::List => list(persistence),
        BackupAction::Restore(id) => {
            let restored = persistence.restore_backup(id)?;
            Ok(restored_result(restored))
        }
        BackupAction::RestoreLatest => {
            let restored = persistence.restore_latest()?;
            Ok(restored_result(restored))
        }
        BackupAction::Prune(days) => {
            let pruned = persistence.backups().prune_older_than(days)?;
            let mut result = CmdResult::default();
            if pruned == 0 {
                result.add_message(CmdMessage::info(format!(
                    "No backups older than {} day(s).",
                    days
                )));
            } else {
                result.add_message(CmdMessage::success(format!(
                    "Pruned {} backup(s).",
                    pruned
                )));
            }
            Ok(result)
        }
    }
}

fn list<S: KvStore, C: Clock>(persistence: &Persistence<S, C>) -> Result<CmdResult> {
    let ring = persistence.backups();
    let entries = ring.list()?;
    let mut result = CmdResult::default();

    if entries.is_empty() {
        result.add_message(CmdMessage::info("No backups."));
    } else {
        let total: usize = entries.iter().map(|e| e.size).sum();
        result.add_message(CmdMessage::info(format!(
            "{} of {} backup slot(s) used ({}).",
            entries.len(),
            ring.capacity(),
            format_size(total)
        )));
    }

    Ok(result.with_backups(entries))
}

fn restored_result(restored: RestoredBackup) -> CmdResult {
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Restored backup {} ({} section(s)).",
        restored.entry.id,
        restored.data.len()
    )));
    if let Some(safety) = &restored.safety_backup {
        result.add_message(CmdMessage::info(format!(
            "Replaced data kept as backup {}.",
            safety.id
        )));
    }
    result.with_data(restored.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{form, persistence};
    use crate::error::FichaError;
    use crate::model::FormData;
    use crate::persistence::SaveOptions;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_list_empty() {
        let p = persistence();
        let result = run(&p, BackupAction::List).unwrap();
        assert!(result.backups.is_empty());
        assert_eq!(result.messages[0].content, "No backups.");
    }

    #[test]
    fn test_list_reports_slots() {
        let p = persistence();
        for _ in 0..3 {
            p.save(&form(), SaveOptions::default()).unwrap();
        }
        let result = run(&p, BackupAction::List).unwrap();
        assert_eq!(result.backups.len(), 2);
        assert!(result.messages[0].content.starts_with("2 of 5"));
    }

    #[test]
    fn test_restore_latest() {
        let p = persistence();
        p.save(&form(), SaveOptions::default()).unwrap();
        let newer = FormData::new().with_section("consultor", json!({"nome": "Rita"}));
        p.save(&newer, SaveOptions::default()).unwrap();

        let result = run(&p, BackupAction::RestoreLatest).unwrap();
        assert_eq!(result.data, Some(form()));
        assert_eq!(result.messages.len(), 2);
    }

    #[test]
    fn test_restore_unknown_id() {
        let p = persistence();
        p.save(&form(), SaveOptions::default()).unwrap();
        assert!(matches!(
            run(&p, BackupAction::Restore(42)).unwrap_err(),
            FichaError::BackupNotFound(42)
        ));
    }

    #[test]
    fn test_restore_latest_without_backups() {
        let p = persistence();
        assert!(matches!(
            run(&p, BackupAction::RestoreLatest).unwrap_err(),
            FichaError::NoBackups
        ));
    }

    #[test]
    fn test_prune() {
        let p = persistence();
        p.save(&form(), SaveOptions::default()).unwrap();
        p.save(&form(), SaveOptions::default()).unwrap();

        let result = run(&p, BackupAction::Prune(7)).unwrap();
        assert!(result.messages[0].content.starts_with("No backups older"));

        p.clock().advance(Duration::days(8));
        let result = run(&p, BackupAction::Prune(7)).unwrap();
        assert_eq!(result.messages[0].content, "Pruned 1 backup(s).");
        assert_eq!(p.backups().len().unwrap(), 0);
    }
}
