#[allow(unused)]
pub use anyhow::{anyhow, bail, ensure, Error};

#[derive(Debug, thiserror::Error)]
pub enum JWEError {
    #[error("Internal error: [{0}]")]
    InternalError(String),
    #[error("Unsupported algorithm: [{0}]")]
    UnsupportedAlgorithm(String),
    #[error("Invalid key type: {0}")]
    InvalidKeyType(String),
    #[error("Precondition violation: {0}")]
    PreconditionViolation(String),
    #[error("Unsupported curve: [{0}]")]
    UnsupportedCurve(String),
    #[error("Crypto engine failure")]
    CryptoEngineFailure,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid key pair")]
    InvalidKeyPair,
    #[error("Weak key")]
    WeakKey,
    #[error("Unsupported RSA modulus")]
    UnsupportedRSAModulus,
}

impl From<&str> for JWEError {
    fn from(e: &str) -> JWEError {
        JWEError::InternalError(e.into())
    }
}

impl JWEError {
    pub(crate) fn invalid_key_type(reason: impl Into<String>) -> Self {
        JWEError::InvalidKeyType(reason.into())
    }

    pub(crate) fn precondition(reason: impl Into<String>) -> Self {
        JWEError::PreconditionViolation(reason.into())
    }
}

/// Maps any backend error to the payload-free engine failure.
pub(crate) fn engine_failure<E>(_: E) -> JWEError {
    JWEError::CryptoEngineFailure
}
