//! Argon2 password hashing, ported from the teacher's `rbp-auth::password`.
//! Not wired into the WebSocket front end directly (no login/registration
//! HTTP surface in scope here — see SPEC_FULL.md Non-goals), but kept
//! available for the account-provisioning service that issues session
//! tokens upstream of this crate.
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

fn salt() -> SaltString {
    use rand::Rng;
    let bytes = &mut [0u8; 16];
    rand::rng().fill(bytes);
    SaltString::encode_b64(bytes).expect("salt")
}

pub fn hash(password: &str) -> Result<String, argon2::password_hash::Error> {
    Argon2::default()
        .hash_password(password.as_bytes(), &salt())
        .map(|h| h.to_string())
}

pub fn verify(password: &str, hashword: &str) -> bool {
    PasswordHash::new(hashword)
        .ok()
        .as_ref()
        .map(|hash| Argon2::default().verify_password(password.as_bytes(), hash).is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_verifies() {
        let hashed = hash("hunter2").unwrap();
        assert!(verify("hunter2", &hashed));
    }

    #[test]
    fn wrong_password_fails() {
        let hashed = hash("hunter2").unwrap();
        assert!(!verify("wrong", &hashed));
    }
}
