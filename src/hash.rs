//! Content fingerprinting for change detection.
//!
//! This is a cheap 32-bit rolling hash, not a cryptographic digest. It only
//! needs to tell "same text" from "different text" between two generations.

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Fingerprint a text blob.
///
/// Stable across runs and platforms for identical input. The empty string
/// hashes to `"0"`.
pub fn hash(text: &str) -> String {
    let mut h: i32 = 0;
    for unit in text.encode_utf16() {
        h = h.wrapping_shl(5).wrapping_sub(h).wrapping_add(unit as i32);
    }
    to_base36(h as i64)
}

fn to_base36(value: i64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let negative = value < 0;
    let mut n = value.unsigned_abs();
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    if negative {
        out.push(b'-');
    }
    out.reverse();

    // Only ASCII digits and '-' are ever pushed.
    String::from_utf8(out).unwrap_or_default()
}
