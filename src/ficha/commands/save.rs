use crate::clock::Clock;
use crate::commands::{format_size, CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::FormData;
use crate::persistence::{Persistence, SaveOptions};
use crate::store::KvStore;

pub fn run<S: KvStore, C: Clock>(
    persistence: &Persistence<S, C>,
    data: &FormData,
    options: SaveOptions,
) -> Result<CmdResult> {
    let report = persistence.save(data, options)?;
    let mut result = CmdResult::default();

    result.add_message(CmdMessage::success(format!(
        "Saved {} section(s) ({}{}).",
        data.len(),
        format_size(report.metadata.size),
        if report.metadata.compressed {
            ", compressed"
        } else {
            ""
        }
    )));
    if let Some(backup) = report.backup {
        result.add_message(CmdMessage::info(format!(
            "Previous version kept as backup {}.",
            backup.id
        )));
    }

    Ok(result)
}
