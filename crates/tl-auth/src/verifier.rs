use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use tl_core::PlayerId;
use tl_store::{AuthError, IdentityProvider};

use crate::claims::Claims;

/// HS256 JWT issuance and verification, standing in for the teacher's
/// `Crypto`. One secret per process; `ttl` bounds how long an issued
/// token asserts a player's identity for.
pub struct JwtVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtVerifier {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = false; // Claims::expired is checked explicitly below.
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, player: &PlayerId) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims::new(player, self.ttl);
        jsonwebtoken::encode(&Header::new(jsonwebtoken::Algorithm::HS256), &claims, &self.encoding)
    }
}

/// A short, non-reversible digest of a token, safe to put in logs or
/// audit events where the raw bearer token must never appear.
pub fn fingerprint(token: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

#[async_trait]
impl IdentityProvider for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<PlayerId, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;
        if data.claims.expired() {
            return Err(AuthError::InvalidToken);
        }
        Ok(data.claims.subject())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> JwtVerifier {
        JwtVerifier::new(b"test-secret", Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn issued_token_verifies_to_its_subject() {
        let verifier = verifier();
        let player = PlayerId::from("alice");
        let token = verifier.issue(&player).unwrap();
        assert_eq!(verifier.verify(&token).await.unwrap(), player);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let verifier = verifier();
        assert_eq!(verifier.verify("not-a-jwt").await.unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn fingerprint_never_contains_the_raw_token() {
        let digest = fingerprint("super-secret-session-token");
        assert!(!digest.contains("secret"));
        assert_eq!(digest.len(), 16);
    }

    #[tokio::test]
    async fn token_signed_with_a_different_secret_is_rejected() {
        let a = JwtVerifier::new(b"secret-a", Duration::from_secs(3600));
        let b = JwtVerifier::new(b"secret-b", Duration::from_secs(3600));
        let token = a.issue(&PlayerId::from("alice")).unwrap();
        assert_eq!(b.verify(&token).await.unwrap_err(), AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let verifier = JwtVerifier::new(b"test-secret", Duration::from_secs(0));
        let token = verifier.issue(&PlayerId::from("alice")).unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(verifier.verify(&token).await.unwrap_err(), AuthError::InvalidToken);
    }
}
