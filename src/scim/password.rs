//! Password digests.
//!
//! Stored passwords have the form `sha256$<64 hex chars>`, so a valid stored
//! value is always [`HASHED_PASSWORD_LEN`] bytes long.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const PREFIX: &str = "sha256$";

/// Length of a stored password digest.
pub const HASHED_PASSWORD_LEN: usize = PREFIX.len() + 64;

/// Hash a cleartext password into its stored form.
pub fn hash_password(cleartext: &str) -> String {
    let digest = Sha256::digest(cleartext.as_bytes());
    format!("{}{}", PREFIX, hex::encode(digest))
}

/// Compare a cleartext password against a stored digest in constant time.
pub fn verify_password(cleartext: &str, stored: &str) -> bool {
    if stored.len() != HASHED_PASSWORD_LEN {
        return false;
    }
    let candidate = hash_password(cleartext);
    candidate.as_bytes().ct_eq(stored.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_shape() {
        let hashed = hash_password("hunter2");
        assert!(hashed.starts_with("sha256$"));
        assert_eq!(hashed.len(), HASHED_PASSWORD_LEN);
        assert_eq!(hashed, hash_password("hunter2"));
    }

    #[test]
    fn test_verify() {
        let stored = hash_password("correct horse");
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("wrong horse", &stored));
        assert!(!verify_password("correct horse", ""));
    }
}
