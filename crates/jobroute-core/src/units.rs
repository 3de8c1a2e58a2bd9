//! Human-readable byte sizes in 1024-based steps.
//!
//! Config bounds are written as `"1 KB"`, `"100 MB"` or bare byte counts,
//! and the measurement trail renders totals back as `"3.23 KB"`. Negative
//! values are the "unbounded" sentinel and render as `"Infinity"`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Unit tokens, each 1024 times the previous one.
pub const UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Rendering of negative (unbounded) sizes.
pub const INFINITY: &str = "Infinity";

static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?\d+)(?:\s+([A-Za-z]+))?$").expect("size pattern compiles")
});

static NUMERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+(?:\.\d+)?$").expect("numeral pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("malformed size: '{0}'")]
    MalformedInput(String),
}

/// Parse a size string such as `"1 KB"`, `" 42\n"` or `"-1"` into bytes.
///
/// Unit tokens are case-insensitive. A negative value is returned as-is,
/// without applying the unit, so `"-1"` stays `-1`.
pub fn parse_size(input: &str) -> Result<i128, UnitError> {
    let malformed = || UnitError::MalformedInput(input.to_string());
    let caps = SIZE_RE.captures(input.trim()).ok_or_else(malformed)?;

    let value: i128 = caps[1].parse().map_err(|_| malformed())?;
    if value < 0 {
        return Ok(value);
    }

    let exponent = match caps.get(2) {
        Some(unit) => unit_exponent(unit.as_str()).ok_or_else(malformed)?,
        None => 0,
    };
    value
        .checked_mul(1024_i128.pow(exponent))
        .ok_or_else(malformed)
}

/// Parse a size from an untyped config value (integer or size string).
pub fn parse_size_value(value: &Value) -> Result<i128, UnitError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i128::from(i))
            } else if let Some(u) = n.as_u64() {
                Ok(i128::from(u))
            } else {
                Err(UnitError::MalformedInput(n.to_string()))
            }
        }
        Value::String(s) => parse_size(s),
        other => Err(UnitError::MalformedInput(other.to_string())),
    }
}

/// Render a byte count as `"<value> <UNIT>"` with two decimals.
///
/// `unit_hint` caps the unit the value climbs to; an unknown hint never
/// matches, which leaves the choice to the size of the value.
pub fn format_bytes(bytes: i128, unit_hint: Option<&str>) -> String {
    render(bytes as f64, unit_hint)
}

/// Like [`format_bytes`], but for a numeral given as text.
///
/// Surrounding whitespace is ignored; anything that is not a single
/// (optionally signed, optionally decimal) number is rejected.
pub fn format_size(input: &str, unit_hint: Option<&str>) -> Result<String, UnitError> {
    let trimmed = input.trim();
    if !NUMERAL_RE.is_match(trimmed) {
        return Err(UnitError::MalformedInput(input.to_string()));
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| UnitError::MalformedInput(input.to_string()))?;
    Ok(render(value, unit_hint))
}

fn render(mut value: f64, unit_hint: Option<&str>) -> String {
    if value < 0.0 {
        return INFINITY.to_string();
    }
    let mut idx = 0;
    while value >= 1024.0
        && idx < UNITS.len() - 1
        && !unit_hint.is_some_and(|hint| hint.eq_ignore_ascii_case(UNITS[idx]))
    {
        value /= 1024.0;
        idx += 1;
    }
    format!("{value:.2} {}", UNITS[idx])
}

fn unit_exponent(token: &str) -> Option<u32> {
    UNITS
        .iter()
        .position(|unit| unit.eq_ignore_ascii_case(token))
        .map(|idx| idx as u32)
}
