use tl_store::AuthError;

/// Connection-origin allow-list, checked once per WebSocket upgrade.
/// An empty allow-list means any origin is accepted (local/dev mode) —
/// mirrors the teacher's `Cors::default().allow_any_origin()` used when
/// no explicit allow-list is configured.
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }

    pub fn allow_any() -> Self {
        Self { allowed: Vec::new() }
    }

    pub fn check(&self, origin: Option<&str>) -> Result<(), AuthError> {
        if self.allowed.is_empty() {
            return Ok(());
        }
        match origin {
            Some(origin) if self.allowed.iter().any(|a| a == origin) => Ok(()),
            _ => Err(AuthError::OriginRejected),
        }
    }
}
