use super::print::{
    eprint_messages, print_analytics, print_backups, print_config, print_messages,
};
use super::setup::{BackupCommands, CleanupArgs, Cli, Commands};
use clap::Parser;
use directories::ProjectDirs;
use ficha::api::FichaApi;
use ficha::commands::backups::BackupAction;
use ficha::commands::config::ConfigAction;
use ficha::commands::FichaPaths;
use ficha::config::FichaConfig;
use ficha::error::{FichaError, Result};
use ficha::persistence::{CleanupOptions, LoadOptions, Persistence, SaveOptions};
use ficha::store::fs::FileKvStore;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const HOME_ENV: &str = "FICHA_HOME";
const LOG_ENV: &str = "FICHA_LOG";

struct AppContext {
    api: FichaApi<FileKvStore>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = init_context()?;

    match cli.command {
        Commands::Save {
            file,
            no_backup,
            no_compress,
        } => handle_save(&ctx, file, no_backup, no_compress),
        Commands::Load {
            no_migrate,
            no_fallback,
            no_verify,
            compact,
            output,
        } => handle_load(
            &ctx,
            LoadOptions {
                auto_migrate: !no_migrate,
                fallback_to_backup: !no_fallback,
                verify_checksum: !no_verify,
                ..LoadOptions::default()
            },
            compact,
            output,
        ),
        Commands::Export { path } => handle_export(&ctx, &path),
        Commands::Import { path } => handle_import(&ctx, &path),
        Commands::Backups(cmd) => handle_backups(&ctx, cmd),
        Commands::Cleanup(args) => handle_cleanup(&ctx, args),
        Commands::Doctor => handle_doctor(&ctx),
        Commands::Stats => handle_stats(&ctx),
        Commands::Config { key, value } => handle_config(&ctx, key, value),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "ficha=debug" } else { "ficha=warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| default_filter.into());

    // A second init (tests calling run twice) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

fn data_dir() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return Ok(PathBuf::from(home));
    }
    ProjectDirs::from("com", "ficha", "ficha")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| FichaError::Api("Could not determine data directory".into()))
}

fn init_context() -> Result<AppContext> {
    let paths = FichaPaths::new(data_dir()?);
    let config = FichaConfig::load(&paths.data_dir)?;
    debug!(data_dir = %paths.data_dir.display(), prefix = %config.storage_prefix, "context ready");

    let store = FileKvStore::new(paths.storage_dir.clone());
    let api = FichaApi::new(Persistence::new(store, config), paths);
    api.start_session();

    Ok(AppContext { api })
}

fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => {
            std::fs::read_to_string(&path).map_err(FichaError::Io)
        }
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(FichaError::Io)?;
            Ok(buffer)
        }
    }
}

fn handle_save(
    ctx: &AppContext,
    file: Option<PathBuf>,
    no_backup: bool,
    no_compress: bool,
) -> Result<()> {
    let json = read_input(file)?;
    let defaults = ctx.api.default_save_options();
    let options = SaveOptions {
        create_backup: !no_backup,
        compress: defaults.compress && !no_compress,
        ..defaults
    };
    let result = ctx.api.save_json(&json, options)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_load(
    ctx: &AppContext,
    options: LoadOptions,
    compact: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let result = ctx.api.load(options)?;
    if let Some(data) = &result.data {
        let json = if compact {
            serde_json::to_string(data)?
        } else {
            serde_json::to_string_pretty(data)?
        };
        match &output {
            Some(path) => std::fs::write(path, json).map_err(FichaError::Io)?,
            None => println!("{}", json),
        }
    }
    eprint_messages(&result.messages);
    Ok(())
}

fn handle_export(ctx: &AppContext, path: &Path) -> Result<()> {
    let result = ctx.api.export(path)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_import(ctx: &AppContext, path: &Path) -> Result<()> {
    let result = ctx.api.import(path)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_backups(ctx: &AppContext, cmd: BackupCommands) -> Result<()> {
    let action = match cmd {
        BackupCommands::List => BackupAction::List,
        BackupCommands::Restore { id } => BackupAction::Restore(id),
        BackupCommands::RestoreLatest => BackupAction::RestoreLatest,
        BackupCommands::Prune { days } => BackupAction::Prune(days),
    };
    let result = ctx.api.backups(action)?;
    print_backups(&result.backups);
    print_messages(&result.messages);
    Ok(())
}

fn handle_cleanup(ctx: &AppContext, args: CleanupArgs) -> Result<()> {
    let result = ctx.api.cleanup(CleanupOptions {
        remove_backups: args.backups,
        remove_analytics: args.analytics,
        remove_all: args.all,
    })?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_doctor(ctx: &AppContext) -> Result<()> {
    let result = ctx.api.doctor()?;
    print_messages(&result.messages);
    if result.has_errors() {
        return Err(FichaError::Api("integrity check failed".into()));
    }
    Ok(())
}

fn handle_stats(ctx: &AppContext) -> Result<()> {
    let result = ctx.api.stats()?;
    if let Some(report) = &result.analytics {
        print_analytics(report);
        println!();
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_config(ctx: &AppContext, key: Option<String>, value: Option<String>) -> Result<()> {
    let action = match (key, value) {
        (None, _) => ConfigAction::ShowAll,
        (Some(key), None) => ConfigAction::ShowKey(key),
        (Some(key), Some(value)) => ConfigAction::Set(key, value),
    };

    let result = ctx.api.config(action)?;
    if result.messages.is_empty() {
        if let Some(config) = &result.config {
            print_config(config);
        }
    }
    print_messages(&result.messages);
    if result.has_errors() {
        return Err(FichaError::Api("config command failed".into()));
    }
    Ok(())
}
