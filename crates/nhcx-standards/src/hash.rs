#![deny(unsafe_code)]

use sha2::Digest;

/// Lowercase hex SHA-256, used for dictionary version fingerprints.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(sha2::Sha256::digest(bytes))
}
