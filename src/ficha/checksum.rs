//! Content fingerprint and metadata envelope for stored payloads.
//!
//! The fingerprint is the classic 31-multiplier string hash over UTF-16 code
//! units, truncated to 32 bits. It is a corruption smell test only and must
//! not be used where collisions matter.

use crate::model::{Metadata, CURRENT_SCHEMA_VERSION};
use chrono::{DateTime, Utc};

/// 32-bit rolling hash of `text`, rendered as 8 lowercase hex digits.
pub fn fingerprint(text: &str) -> String {
    let mut hash: i32 = 0;
    for unit in text.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    format!("{:08x}", hash as u32)
}

/// Builds the metadata for a payload already serialised into `stored`.
pub fn build_metadata(
    stored: &str,
    compressed: bool,
    now: DateTime<Utc>,
    user_agent: &str,
) -> Metadata {
    Metadata {
        version: CURRENT_SCHEMA_VERSION.to_string(),
        timestamp: now,
        size: stored.len(),
        checksum: fingerprint(stored),
        compressed,
        user_agent: user_agent.to_string(),
    }
}

/// Identifies this library in [`Metadata::user_agent`].
pub fn default_user_agent() -> String {
    format!(
        "{}/{} ({})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}
