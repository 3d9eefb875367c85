use thiserror::Error;

/// Why a token could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Signature is valid but `exp` has passed. The subject is trustworthy
    /// because the signature was checked first.
    #[error("token expired")]
    Expired { subject: String },
    #[error("signature verification failed")]
    BadSignature,
    #[error("invalid token format")]
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Either the token did not decode (`cause` set) or its subject is not
    /// the one being accessed (`cause` is `None`).
    #[error("unauthorized")]
    Unauthorized { cause: Option<TokenError> },
}

/// Startup failures while loading the RSA key pair.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid base64 in {0} key")]
    Base64(&'static str),
    #[error("failed to parse RSA {0} key")]
    Parse(&'static str),
    #[error("public key does not match private key")]
    Mismatch,
}
