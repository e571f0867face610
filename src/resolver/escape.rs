//! Case-escape rules for module paths and versions.
//!
//! Case-insensitive filesystems cannot round-trip uppercase letters, so
//! the protocol encodes `A` as `!a`. An escaped string therefore never
//! contains an uppercase letter, and `!` may only precede a lowercase
//! one. The encoding must stay bit-exact for cross-ecosystem
//! compatibility.

use crate::error::{Error, Result};

/// Decode an escaped module path into its canonical form.
pub fn unescape_path(escaped: &str) -> Result<String> {
    unescape(escaped)
        .ok_or_else(|| Error::InvalidResource(format!("invalid escaped module path {escaped:?}")))
}

/// Decode an escaped version tag into its canonical form.
pub fn unescape_version(escaped: &str) -> Result<String> {
    unescape(escaped)
        .ok_or_else(|| Error::InvalidResource(format!("invalid escaped version {escaped:?}")))
}

/// Encode uppercase letters as `!x`; the inverse of the decoders above.
pub fn escape(plain: &str) -> String {
    let mut out = String::with_capacity(plain.len());
    for c in plain.chars() {
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn unescape(escaped: &str) -> Option<String> {
    if escaped.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        match c {
            '!' => match chars.next() {
                Some(next) if next.is_ascii_lowercase() => out.push(next.to_ascii_uppercase()),
                _ => return None,
            },
            c if c.is_ascii_uppercase() => return None,
            c => out.push(c),
        }
    }
    Some(out)
}
