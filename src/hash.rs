//! Content hashing for signature records.
//!
//! A fixed SHA-256 digest, rendered as lowercase hex, so that hashes recorded
//! by one deployment compare byte-for-byte against hashes recomputed by
//! another. The digest is a pure function of the input bytes and never fails;
//! the algorithm is compiled in, so there is no runtime "algorithm not
//! available" failure mode.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of `bytes` as a lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
