//! Content fingerprints used to compare artifacts.

use md5::{Digest, Md5};

/// Lowercase hex MD5 of `bytes`. Unsalted, so equal input yields equal output.
pub fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// True when `value` has the shape of an MD5 hex digest.
pub fn is_md5_hex(value: &str) -> bool {
    value.len() == 32
        && value
            .chars()
            .all(|ch| ch.is_ascii_digit() || ('a'..='f').contains(&ch))
}
