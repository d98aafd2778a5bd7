//! Content hashing using blake3.
//!
//! # Usage
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let key = hash::hex("/blog|page=2|en"); // 64 hex chars
//! let fp = hash::fingerprint(".btn { color: red }"); // 16 hex chars
//! ```

/// Full blake3 digest of `data` as lowercase hex.
#[inline]
pub fn hex<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    blake3::hash(data.as_ref()).to_hex().to_string()
}

/// Short fingerprint used for deduplication keys.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    let digest = blake3::hash(data.as_ref());
    hex::encode(&digest.as_bytes()[..8])
}
