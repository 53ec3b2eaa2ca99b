//! Validation utilities for the period balance engine
//!
//! User input reaching the engine is parsed leniently, matching how the status
//! screens have always treated the adjustment field.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

// ============================================================================
// Adjustment Input
// ============================================================================

/// Parse a user-entered adjustment. Anything that is not a number becomes 0.
pub fn parse_adjustment(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => parse_adjustment_str(&n.to_string()),
        Value::String(s) => parse_adjustment_str(s),
        _ => Decimal::ZERO,
    }
}

/// Parse an adjustment from text. Accepts a leading numeric prefix the way a
/// browser number field does ("12.5kg" -> 12.5); otherwise 0.
///
/// Exponent notation that doesn't fit in a `Decimal` ("1e-30", "1e30") is
/// 0, never the digits before the `e`.
pub fn parse_adjustment_str(input: &str) -> Decimal {
    let trimmed = input.trim();
    if let Ok(d) = Decimal::from_str(trimmed) {
        return d;
    }
    if is_scientific(trimmed) {
        return Decimal::from_scientific(trimmed).unwrap_or(Decimal::ZERO);
    }

    let prefix = numeric_prefix(trimmed);
    Decimal::from_str(prefix).unwrap_or(Decimal::ZERO)
}

/// Whole input is `<number>e<integer>`
fn is_scientific(s: &str) -> bool {
    let Some((mantissa, exponent)) = s.split_once(|c: char| c == 'e' || c == 'E') else {
        return false;
    };
    let digits = exponent
        .strip_prefix(|c: char| c == '+' || c == '-')
        .unwrap_or(exponent);
    let prefix = numeric_prefix(mantissa);

    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && !prefix.is_empty()
        && prefix == mantissa.trim_end_matches('.')
}

fn numeric_prefix(s: &str) -> &str {
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for (i, c) in s.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            '0'..='9' => seen_digit = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }

    if seen_digit {
        s[..end].trim_end_matches('.')
    } else {
        ""
    }
}
