use chrono::{DateTime, Utc};
use colored::Colorize;
use ficha::analytics::AnalyticsReport;
use ficha::api::{CmdMessage, MessageLevel};
use ficha::config::FichaConfig;
use ficha::model::BackupEntry;
use timeago::Formatter;

const TIME_WIDTH: usize = 16;

pub(super) fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        println!("{}", styled(message));
    }
}

/// Same as [`print_messages`] but on stderr, for commands whose stdout is data.
pub(super) fn eprint_messages(messages: &[CmdMessage]) {
    for message in messages {
        eprintln!("{}", styled(message));
    }
}

fn styled(message: &CmdMessage) -> colored::ColoredString {
    match message.level {
        MessageLevel::Info => message.content.dimmed(),
        MessageLevel::Success => message.content.green(),
        MessageLevel::Warning => message.content.yellow(),
        MessageLevel::Error => message.content.red(),
    }
}

pub(super) fn print_backups(entries: &[BackupEntry]) {
    for entry in entries {
        let time_ago = format_time_ago(entry.timestamp);
        println!(
            "  {}  {}  {:>10}  {}",
            entry.id.to_string().yellow(),
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            format!("{} B", entry.size),
            time_ago.dimmed()
        );
    }
}

pub(super) fn print_config(config: &FichaConfig) {
    for key in FichaConfig::KEYS {
        if let Some(value) = config.get(key) {
            println!("{} = {}", key, value);
        }
    }
}

pub(super) fn print_analytics(report: &AnalyticsReport) {
    println!("{} {}", "session".bold(), report.session_id);
    println!(
        "{} {} ({})",
        "first access".bold(),
        report.first_access.format("%Y-%m-%d %H:%M"),
        format_time_ago(report.first_access).trim()
    );
    println!(
        "{} {} ({})",
        "last access".bold(),
        report.last_access.format("%Y-%m-%d %H:%M"),
        format_time_ago(report.last_access).trim()
    );
    if !report.counters.is_empty() {
        println!();
        for (action, count) in &report.counters {
            println!("  {:<18} {}", action, count);
        }
    }
    if !report.actions.is_empty() {
        println!();
        for action in report.recent_actions() {
            println!(
                "  {}  {}",
                action.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                action.action
            );
        }
    }
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let time_str = Formatter::new().convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
