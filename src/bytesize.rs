//! Human byte quantities such as `1MB` or `500KB`.
use std::sync::LazyLock;

use regex::Regex;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

static BYTE_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(KB|MB|GB)?$").expect("valid byte size regex"));

/// Parses a byte quantity like `10MB`, case-insensitively.
///
/// Anything that does not match `<digits>[KB|MB|GB]` yields `0`, so callers
/// cannot tell an absent value from a malformed one.
pub fn parse(value: &str) -> u64 {
    let value = value.trim().to_uppercase();
    let Some(caps) = BYTE_SIZE.captures(&value) else {
        return 0;
    };

    let Ok(size) = caps[1].parse::<u64>() else {
        return 0;
    };
    let multiplier = match caps.get(2).map(|unit| unit.as_str()) {
        Some("KB") => KB,
        Some("MB") => MB,
        Some("GB") => GB,
        _ => 1,
    };

    size.checked_mul(multiplier).unwrap_or(0)
}

/// Formats a byte count using the largest whole unit, truncating.
///
/// `format(0)` renders `"0B"`; writers omit zero sizes instead of calling this.
pub fn format(bytes: u64) -> String {
    match bytes {
        b if b < KB => format!("{b}B"),
        b if b < MB => format!("{}KB", b / KB),
        b if b < GB => format!("{}MB", b / MB),
        b => format!("{}GB", b / GB),
    }
}
