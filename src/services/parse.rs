//! Defensive parsing of model output.
//!
//! Language model completions are untrusted text that usually, but not
//! always, contains the JSON we asked for. These helpers extract the first
//! balanced object or array with a single-pass bracket match that is aware
//! of string literals and escapes, then hand it to serde. Every caller has
//! a deterministic fallback for `None`.

use serde_json::Value;

/// Extract and parse the first balanced JSON object in `text`
pub fn extract_object(text: &str) -> Option<Value> {
    let slice = balanced_slice(text, b'{', b'}')?;
    serde_json::from_str(slice).ok()
}

/// Extract and parse the first balanced JSON array in `text`
pub fn extract_array(text: &str) -> Option<Value> {
    let slice = balanced_slice(text, b'[', b']')?;
    serde_json::from_str(slice).ok()
}

/// Find the first balanced `open..close` region outside string literals.
///
/// Single pass, O(n). Returns `None` when no complete region exists.
fn balanced_slice(text: &str, open: u8, close: u8) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &byte) in bytes.iter().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }

        if in_string && byte == b'\\' {
            escape_next = true;
            continue;
        }

        if byte == b'"' {
            in_string = !in_string;
            continue;
        }

        if in_string {
            continue;
        }

        if byte == open {
            if depth == 0 {
                start = Some(i);
            }
            depth += 1;
        } else if byte == close {
            if depth == 0 {
                // Stray closer before any opener; keep scanning
                continue;
            }
            depth -= 1;
            if depth == 0 {
                if let Some(s) = start {
                    return Some(&text[s..=i]);
                }
            }
        }
    }

    None
}

/// Read a string field, trimmed; `None` when absent or not a string
pub fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Read a numeric field as f32, clamped to [0, 1]
pub fn confidence_field(value: &Value, key: &str) -> Option<f32> {
    value
        .get(key)
        .and_then(Value::as_f64)
        .map(|f| (f as f32).clamp(0.0, 1.0))
}

/// Read a boolean field
pub fn bool_field(value: &Value, key: &str) -> Option<bool> {
    value.get(key).and_then(Value::as_bool)
}

/// Read an array field of strings, skipping non-string entries
pub fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
