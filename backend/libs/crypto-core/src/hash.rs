use sha2::{Digest, Sha256};

/// Short, non-reversible identifier for a token, safe to put in logs
///
/// First 8 bytes of the SHA-256 digest, hex encoded.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..8])
}
