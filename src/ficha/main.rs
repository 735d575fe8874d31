//! # Ficha CLI
//!
//! The binary is intentionally thin: the CLI lives in `cli/`, this file only
//! invokes `cli::run()` and turns errors into an exit code. Everything from
//! `api.rs` inward is UI agnostic; see the library docs for the layering.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
