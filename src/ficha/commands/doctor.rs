use crate::clock::Clock;
use crate::commands::{format_size, CmdMessage, CmdResult};
use crate::error::Result;
use crate::persistence::Persistence;
use crate::store::KvStore;

pub fn run<S: KvStore, C: Clock>(persistence: &Persistence<S, C>) -> Result<CmdResult> {
    let report = persistence.check_integrity();
    let mut result = CmdResult::default();

    if report.is_valid {
        result.add_message(CmdMessage::success("No problems found."));
    } else {
        result.add_message(CmdMessage::warning(format!(
            "{} problem(s) found:",
            report.issues.len()
        )));
        for issue in &report.issues {
            result.add_message(CmdMessage::error(format!("  - {}", issue)));
        }
    }
    for recommendation in &report.recommendations {
        result.add_message(CmdMessage::info(format!("  > {}", recommendation)));
    }
    result.add_message(CmdMessage::info(format!(
        "{} backup(s), {} of {} used ({:.1}%).",
        report.backup_count,
        format_size(report.usage_bytes),
        format_size(report.quota_bytes),
        report.usage_percent()
    )));

    Ok(result.with_integrity(report))
}
