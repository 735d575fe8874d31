//! # Ficha Architecture
//!
//! Ficha is a **versioned local persistence layer** for a multi-section
//! technical data sheet ("ficha técnica"). The form is a JSON object of named
//! sections; this crate keeps it safely on disk across sessions and app
//! upgrades. A small CLI wraps the library, but the library is the product.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (cli/, wired by main.rs)                               │
//! │  - Parses arguments, prints results, owns exit codes        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API (api.rs) + Commands (commands/*.rs)                    │
//! │  - Use cases returning CmdResult; no terminal I/O           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Persistence facade (persistence.rs)                        │
//! │  - save / load / cleanup / check_integrity                  │
//! │  - composes codec, checksum, migrations, backups, analytics │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage (store/)                                           │
//! │  - KvStore trait; FileKvStore (production), MemStore (tests)│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Components never reach for a global store or the wall clock. They are
//! handed a [`store::KvStore`] and a [`clock::Clock`], which is what lets the
//! staleness, pruning and recovery paths be tested deterministically.
//!
//! ## Module Overview
//!
//! - [`api`]: Facade used by UI clients
//! - [`commands`]: Use cases (save, load, export, import, backups, ...)
//! - [`persistence`]: The facade over all components
//! - [`codec`]: Whitespace-collapsing compression envelope
//! - [`checksum`]: Fingerprint and metadata construction
//! - [`migration`]: Schema version registry and standard steps
//! - [`backup`]: Bounded backup ring
//! - [`analytics`]: Best-effort usage recording
//! - [`sanitize`]: Empty-section detection used by import
//! - [`store`]: Key-value storage abstraction and implementations
//! - [`model`]: Form and record types
//! - [`config`]: Configuration file
//! - [`clock`]: Time source abstraction
//! - [`error`]: Error types

pub mod analytics;
pub mod api;
pub mod backup;
pub mod checksum;
pub mod clock;
pub mod codec;
pub mod commands;
pub mod config;
pub mod error;
pub mod migration;
pub mod model;
pub mod persistence;
pub mod sanitize;
pub mod store;
