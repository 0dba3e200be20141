//! Session-token verification, password hashing, and connection-origin
//! allow-listing for the WebSocket front end.
//!
//! Ported from the teacher's `rbp-auth`: HS256 JWTs signed with
//! [`jsonwebtoken`], Argon2 password hashes, and a `Claims` payload
//! shaped the same way (`sub`/`iat`/`exp`), adapted to this crate's
//! string-keyed [`tl_core::PlayerId`] instead of a UUID `ID<Member>`.
mod claims;
mod origin;
pub mod password;
mod verifier;

pub use claims::Claims;
pub use origin::OriginPolicy;
pub use verifier::{fingerprint, JwtVerifier};
