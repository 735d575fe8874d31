use clap::{Args, Parser, Subcommand};
use ficha::config::MAX_AGE_DAYS;
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234 2025-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "ficha", bin_name = "ficha", version = get_version())]
#[command(about = "Versioned local storage for technical data sheets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save a form read from a JSON file (or stdin)
    Save {
        /// JSON file with the form sections; reads stdin when omitted or "-"
        file: Option<PathBuf>,

        /// Do not keep the previous version as a backup
        #[arg(long)]
        no_backup: bool,

        /// Store the payload without compression
        #[arg(long)]
        no_compress: bool,
    },

    /// Print the stored form as JSON
    Load {
        /// Keep data at its stored schema version
        #[arg(long)]
        no_migrate: bool,

        /// Fail instead of restoring a backup when data is corrupt or stale
        #[arg(long)]
        no_fallback: bool,

        /// Skip the checksum comparison
        #[arg(long)]
        no_verify: bool,

        /// Single-line JSON output
        #[arg(long)]
        compact: bool,

        /// Write the JSON to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the stored form to a file (gzip when the name ends in .gz)
    Export { path: PathBuf },

    /// Read a form from an export file or a bare JSON object and store it
    Import { path: PathBuf },

    /// Manage backups
    #[command(subcommand)]
    Backups(BackupCommands),

    /// Remove stored data and prune aged backups
    Cleanup(CleanupArgs),

    /// Check the stored data for problems
    Doctor,

    /// Show usage statistics
    Stats,

    /// Show or change configuration
    Config {
        /// Configuration key
        key: Option<String>,

        /// New value
        value: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// List backups, newest last
    #[command(alias = "ls")]
    List,

    /// Restore a backup by id
    Restore { id: i64 },

    /// Restore the most recent backup
    RestoreLatest,

    /// Remove backups older than the given number of days
    Prune {
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(i64).range(0..=MAX_AGE_DAYS))]
        days: i64,
    },
}

#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Also remove all backups
    #[arg(long)]
    pub backups: bool,

    /// Also remove usage statistics
    #[arg(long)]
    pub analytics: bool,

    /// Remove everything ficha has stored
    #[arg(long, conflicts_with_all = ["backups", "analytics"])]
    pub all: bool,
}
