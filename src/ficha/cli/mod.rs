//! # CLI Behavior
//!
//! One possible client for the ficha library. This is the only place that
//! knows about terminal I/O, environment variables and exit codes.
//!
//! ## Data Location
//!
//! The data directory is `$FICHA_HOME` when set, otherwise the platform data
//! directory (`directories::ProjectDirs`). It holds `config.json` and a
//! `storage/` directory with one file per storage key.
//!
//! ## Output
//!
//! `load` writes the form as JSON to stdout and its messages to stderr, so
//! the output can be piped. Every other command prints messages to stdout.
//! Logs go to stderr; `-v` lowers the level to debug and `FICHA_LOG` takes
//! an `EnvFilter` directive.
//!
//! ## Module Structure
//!
//! - `commands`: Context setup and per-command handlers
//! - `print`: Output formatting
//! - `setup`: Argument parsing via clap

mod commands;
mod print;
pub mod setup;

pub use commands::run;
