use crate::clock::Clock;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::{FormData, Section};
use crate::persistence::{LoadOptions, LoadOutcome, Persistence};
use crate::store::KvStore;

pub fn run<S: KvStore, C: Clock>(
    persistence: &Persistence<S, C>,
    options: LoadOptions,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();

    match persistence.load(options)? {
        LoadOutcome::Empty => {
            result.add_message(CmdMessage::info("No saved data."));
        }
        LoadOutcome::Loaded { data, metadata } => {
            result.add_message(CmdMessage::info(format!(
                "Loaded {} section(s) saved {}.",
                data.len(),
                metadata.timestamp.format("%Y-%m-%d %H:%M UTC")
            )));
            result = result.with_data(data);
        }
        LoadOutcome::Migrated {
            data, from_version, ..
        } => {
            result.add_message(CmdMessage::info(format!(
                "Migrated stored data from version {} to {}.",
                from_version,
                persistence.migrations().current_version()
            )));
            result = result.with_data(data);
        }
        LoadOutcome::Recovered {
            data,
            backup_id,
            reason,
        } => {
            result.add_message(CmdMessage::warning(format!(
                "Stored data was unusable ({}); restored backup {}.",
                reason, backup_id
            )));
            result = result.with_data(data);
        }
    }

    if let Some(data) = &result.data {
        result.messages.extend(section_summary(data));
    }

    Ok(result)
}

/// Notes for known sections still missing and for sections outside the form.
fn section_summary(data: &FormData) -> Vec<CmdMessage> {
    let mut messages = Vec::new();

    let missing: Vec<String> = Section::ALL
        .iter()
        .filter(|s| data.known_section(**s).is_none())
        .map(|s| s.to_string())
        .collect();
    if !missing.is_empty() {
        messages.push(CmdMessage::info(format!(
            "Not filled in yet: {}.",
            missing.join(", ")
        )));
    }

    let unknown: Vec<&str> = data
        .sections()
        .map(|(name, _)| name.as_str())
        .filter(|name| Section::from_name(name).is_none())
        .collect();
    if !unknown.is_empty() {
        messages.push(CmdMessage::info(format!(
            "Kept unrecognised section(s): {}.",
            unknown.join(", ")
        )));
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{form, persistence};
    use crate::commands::MessageLevel;
    use crate::persistence::SaveOptions;

    #[test]
    fn test_load_empty() {
        let p = persistence();
        let result = run(&p, LoadOptions::default()).unwrap();
        assert!(result.data.is_none());
        assert_eq!(result.messages[0].content, "No saved data.");
    }

    #[test]
    fn test_load_saved() {
        let p = persistence();
        p.save(&form(), SaveOptions::default()).unwrap();
        let result = run(&p, LoadOptions::default()).unwrap();
        assert_eq!(result.data, Some(form()));
        assert!(result.messages[0].content.contains("2025-09-15 14:30 UTC"));
    }

    #[test]
    fn test_load_recovered_is_a_warning() {
        let p = persistence();
        p.save(&form(), SaveOptions::default()).unwrap();
        p.save(&form(), SaveOptions::default()).unwrap();
        p.store().set(&p.keys().metadata, "garbage").unwrap();

        let result = run(&p, LoadOptions::default()).unwrap();
        assert_eq!(result.data, Some(form()));
        assert_eq!(result.messages[0].level, MessageLevel::Warning);
    }

    #[test]
    fn test_load_lists_missing_and_unrecognised_sections() {
        let p = persistence();
        let data = form().with_section("anexos", serde_json::json!([]));
        p.save(&data, SaveOptions::default()).unwrap();

        let result = run(&p, LoadOptions::default()).unwrap();
        let contents: Vec<&str> = result.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents[1],
            "Not filled in yet: consultor, acionamentos, seguranca, infraestrutura, observacoes."
        );
        assert_eq!(contents[2], "Kept unrecognised section(s): anexos.");
    }

    #[test]
    fn test_complete_form_has_no_section_notes() {
        let p = persistence();
        let mut data = FormData::new();
        for section in Section::ALL {
            data.set_section(section.as_str(), serde_json::json!({}));
        }
        p.save(&data, SaveOptions::default()).unwrap();

        let result = run(&p, LoadOptions::default()).unwrap();
        assert_eq!(result.messages.len(), 1);
    }
}
