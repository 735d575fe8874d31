use crate::clock::Clock;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::persistence::Persistence;
use crate::store::KvStore;

pub fn run<S: KvStore, C: Clock>(persistence: &Persistence<S, C>) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    match persistence.analytics().report() {
        Some(report) => {
            result.add_message(CmdMessage::info(format!(
                "{} session(s), {} action(s) logged.",
                report.sessions_count, report.total_actions
            )));
            Ok(result.with_analytics(report))
        }
        None => {
            result.add_message(CmdMessage::info("No usage recorded yet."));
            Ok(result)
        }
    }
}
