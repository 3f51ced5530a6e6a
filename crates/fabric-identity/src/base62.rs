//! Base-62 rendering of identifiers as fixed-width name fragments.
//!
//! Digits are `0-9`, then `a-z`, then `A-Z`, so `0` is also the padding
//! character and zero-padding never changes the encoded value.

use fabric_common::{FabricError, FabricResult};

/// Base-62 digit alphabet.
pub const DIGITS: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const BASE: u128 = 62;

/// Encodes a value with no padding (`0` encodes as `"0"`).
pub fn encode(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % BASE) as usize]);
        value /= BASE;
    }
    digits.reverse();
    // Every byte comes from DIGITS, which is ASCII
    digits.into_iter().map(char::from).collect()
}

/// Encodes a value left-padded with `0` to at least `width` characters.
pub fn encode_padded(value: u128, width: usize) -> String {
    format!("{:0>width$}", encode(value), width = width)
}

fn digit_value(c: u8) -> Option<u128> {
    match c {
        b'0'..=b'9' => Some(u128::from(c - b'0')),
        b'a'..=b'z' => Some(u128::from(c - b'a') + 10),
        b'A'..=b'Z' => Some(u128::from(c - b'A') + 36),
        _ => None,
    }
}

/// Decodes a base-62 string.
///
/// Fails on an empty string, characters outside the alphabet, or overflow.
pub fn decode(s: &str) -> FabricResult<u128> {
    let invalid = || FabricError::InvalidBase62 {
        value: s.to_string(),
    };

    if s.is_empty() {
        return Err(invalid());
    }

    s.bytes().try_fold(0u128, |acc, c| {
        let digit = digit_value(c).ok_or_else(invalid)?;
        acc.checked_mul(BASE)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(invalid)
    })
}
