//! Session token configuration.

/// Configuration for session token issuance and validation.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC secret for HS256 signing, configured out-of-band.
    pub secret: String,
    /// Token lifetime in seconds (default: 3600 = 1 hour).
    pub ttl_secs: u64,
    /// Issuer (`iss` claim).
    pub issuer: String,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Self::default()
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_secs: 3600,
            issuer: "warden".into(),
        }
    }
}
