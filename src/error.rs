//! Error model for the authentication and gating subsystem.
//! Adapter-level kinds are surfaced to the caller of the single operation that failed;
//! the terminal kinds end the current authentication attempt and drive the gate to redirect.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The external signing capability is not attached.
    #[error("signing capability unavailable")]
    CapabilityUnavailable,
    /// Cached identity requested before any successful resolution.
    #[error("identity not resolved yet")]
    NotReady,
    #[error("signer initialization exhausted after {attempts} attempts: {last_error}")]
    InitializationExhausted { attempts: u32, last_error: String },
    #[error("authentication timed out after {after_ms}ms")]
    AuthenticationTimeout { after_ms: u64 },
    #[error("capability does not support {scheme} encryption")]
    EncryptionUnsupported { scheme: &'static str },
    #[error("capability does not support {scheme} decryption")]
    DecryptionUnsupported { scheme: &'static str },
    /// Error reported by the external capability itself.
    #[error("{code}: {message}")]
    Signer { code: String, message: String },
    #[error("invalid public key: {0}")]
    InvalidKey(String),
}

impl AuthError {
    pub fn code_str(&self) -> &str {
        match self {
            AuthError::CapabilityUnavailable => "capability_unavailable",
            AuthError::NotReady => "not_ready",
            AuthError::InitializationExhausted { .. } => "initialization_exhausted",
            AuthError::AuthenticationTimeout { .. } => "authentication_timeout",
            AuthError::EncryptionUnsupported { .. } => "encryption_unsupported",
            AuthError::DecryptionUnsupported { .. } => "decryption_unsupported",
            AuthError::Signer { code, .. } => code.as_str(),
            AuthError::InvalidKey(_) => "invalid_key",
        }
    }

    /// Terminal for the current authentication attempt: the gate redirects instead of retrying.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthError::InitializationExhausted { .. } | AuthError::AuthenticationTimeout { .. })
    }

    pub fn signer<S: Into<String>>(code: S, msg: S) -> Self { AuthError::Signer { code: code.into(), message: msg.into() } }
}

pub type AuthResult<T> = Result<T, AuthError>;

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: anything the external capability raised
        AuthError::Signer { code: "signer_error".into(), message: format!("{:#}", err) }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
