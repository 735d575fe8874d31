use crate::clock::Clock;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::persistence::{CleanupOptions, Persistence};
use crate::store::KvStore;

pub fn run<S: KvStore, C: Clock>(
    persistence: &Persistence<S, C>,
    options: CleanupOptions,
) -> Result<CmdResult> {
    let report = persistence.cleanup(options)?;
    let mut result = CmdResult::default();

    if options.remove_all {
        result.add_message(CmdMessage::success("All stored data removed."));
        return Ok(result);
    }

    for key in &report.removed_keys {
        result.add_message(CmdMessage::success(format!("Removed {}.", key)));
    }
    if report.pruned_backups > 0 {
        result.add_message(CmdMessage::success(format!(
            "Pruned {} backup(s) older than {} day(s).",
            report.pruned_backups,
            persistence.config().backup_max_age_days
        )));
    }
    if result.messages.is_empty() {
        result.add_message(CmdMessage::info("Nothing to clean up."));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{form, persistence};
    use crate::persistence::SaveOptions;

    #[test]
    fn test_nothing_to_clean() {
        let p = persistence();
        p.save(&form(), SaveOptions::default()).unwrap();
        let result = run(&p, CleanupOptions::default()).unwrap();
        assert_eq!(result.messages[0].content, "Nothing to clean up.");
    }

    #[test]
    fn test_remove_all() {
        let p = persistence();
        p.save(&form(), SaveOptions::default()).unwrap();
        let result = run(
            &p,
            CleanupOptions {
                remove_all: true,
                ..CleanupOptions::default()
            },
        )
        .unwrap();
        assert_eq!(result.messages.len(), 1);
        assert!(p.store().keys().unwrap().is_empty());
    }

    #[test]
    fn test_remove_backups_reports_key() {
        let p = persistence();
        p.save(&form(), SaveOptions::default()).unwrap();
        p.save(&form(), SaveOptions::default()).unwrap();
        let result = run(
            &p,
            CleanupOptions {
                remove_backups: true,
                ..CleanupOptions::default()
            },
        )
        .unwrap();
        assert_eq!(result.messages[0].content, "Removed fichaTecnica_backups.");
    }
}
