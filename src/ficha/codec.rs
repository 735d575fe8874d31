//! Reversible textual compaction of stored payloads.
//!
//! `compress` collapses the insignificant whitespace of the pretty-printed
//! payload and wraps the result in a [`CompressedEnvelope`] tagged with
//! `__compressed: true`. `decompress` unwraps tagged values and passes
//! everything else through, so data written before compression existed still
//! loads.
//!
//! Neither direction fails: an encoding problem yields the original value, a
//! malformed envelope is returned as-is. The envelope is not guaranteed to be
//! smaller than its input once escaped into the stored JSON.

use crate::error::{FichaError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub const COMPRESSED_TAG: &str = "__compressed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedEnvelope {
    #[serde(rename = "__compressed")]
    pub compressed: bool,
    pub data: String,
    pub original_size: usize,
    pub compressed_size: usize,
    /// `compressed_size / original_size`.
    pub ratio: f64,
}

/// True when `value` carries the compression tag.
pub fn is_compressed(value: &Value) -> bool {
    value.get(COMPRESSED_TAG).and_then(Value::as_bool) == Some(true)
}

/// Wraps `value` in a compressed envelope, or returns it unchanged on failure.
pub fn compress(value: &Value) -> Value {
    let encoded = try_compress(value).and_then(|envelope| {
        serde_json::to_value(&envelope).map_err(FichaError::Serialization)
    });
    match encoded {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "compression failed, storing uncompressed");
            value.clone()
        }
    }
}

fn try_compress(value: &Value) -> Result<CompressedEnvelope> {
    let original = serde_json::to_string_pretty(value)?;
    let collapsed = collapse_whitespace(&original);

    let reparsed: Value = serde_json::from_str(&collapsed)?;
    if &reparsed != value {
        return Err(FichaError::CorruptData(
            "collapsed text does not reproduce the payload".to_string(),
        ));
    }

    let original_size = original.len();
    let compressed_size = collapsed.len();
    Ok(CompressedEnvelope {
        compressed: true,
        data: collapsed,
        original_size,
        compressed_size,
        ratio: if original_size == 0 {
            1.0
        } else {
            compressed_size as f64 / original_size as f64
        },
    })
}

/// Unwraps a compressed envelope. Untagged or malformed values come back as-is.
pub fn decompress(value: Value) -> Value {
    if !is_compressed(&value) {
        return value;
    }
    match try_decompress(&value) {
        Ok(inner) => inner,
        Err(e) => {
            warn!(error = %e, "malformed compressed envelope, returning it unchanged");
            value
        }
    }
}

fn try_decompress(value: &Value) -> Result<Value> {
    let envelope: CompressedEnvelope = serde_json::from_value(value.clone())?;
    Ok(serde_json::from_str(&envelope.data)?)
}

/// Drops whitespace that sits outside JSON string literals.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            c if c.is_whitespace() => {}
            c => out.push(c),
        }
    }
    out
}
