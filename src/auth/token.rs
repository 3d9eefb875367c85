//! RS256 signed tokens (compact JWT serialization).
//!
//! Flow Overview:
//! 1) `TokenIssuer` builds `{iss, sub, iat, exp}` and signs `header.claims`.
//! 2) `TokenVerifier` checks structure, header, signature and expiry, in that order.
//! 3) A verified token is trusted as is: `decode` returns `sub` without further
//!    claim checks, because only this process holds the private key.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rsa::pkcs1v15::Signature;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::error::{AuthError, TokenError};
use super::keys::KeyMaterial;
use crate::clock::Clock;

pub const ISSUER: &str = "FastSurvey";
const ALGORITHM: &str = "RS256";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct Header {
    alg: String,
    typ: String,
}

impl Header {
    fn rs256() -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued token and the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub subject: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Subject namespaces. Admin sessions and submission verification share one
/// key pair, so the prefix is what keeps one kind from standing in for the other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Session,
    Verification,
}

impl Scope {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Session => "admin:",
            Self::Verification => "submission:",
        }
    }

    #[must_use]
    pub fn subject(self, id: &str) -> String {
        format!("{}{id}", self.prefix())
    }

    /// Return the identifier if `subject` belongs to this scope.
    #[must_use]
    pub fn strip(self, subject: &str) -> Option<&str> {
        subject
            .strip_prefix(self.prefix())
            .filter(|id| !id.is_empty())
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

#[derive(Clone)]
pub struct TokenIssuer {
    keys: Arc<KeyMaterial>,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(keys: Arc<KeyMaterial>, clock: Arc<dyn Clock>) -> Self {
        Self { keys, clock }
    }

    #[must_use]
    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Sign a token for `subject` valid for `validity` from now.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be encoded or signing fails.
    pub fn issue(&self, subject: &str, validity: Duration) -> Result<Token> {
        let iat = self.clock.now();
        let ttl = i64::try_from(validity.as_secs()).context("token validity out of range")?;
        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: subject.to_string(),
            iat,
            exp: iat.saturating_add(ttl),
        };

        let header_b64 = b64e_json(&Header::rs256())?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let signature: Signature = self
            .keys
            .signing_key()
            .try_sign(signing_input.as_bytes())
            .context("failed to sign token")?;
        let signature_b64 = Base64UrlUnpadded::encode_string(&signature.to_vec());

        Ok(Token {
            value: format!("{signing_input}.{signature_b64}"),
            subject: claims.sub,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    keys: Arc<KeyMaterial>,
    clock: Arc<dyn Clock>,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(keys: Arc<KeyMaterial>, clock: Arc<dyn Clock>) -> Self {
        Self { keys, clock }
    }

    /// Verify `token` and return its subject.
    ///
    /// # Errors
    /// `Malformed` if the token is not a well-formed RS256 JWT, `BadSignature`
    /// if the signature does not match, `Expired` if `exp` is in the past.
    pub fn decode(&self, token: &str) -> Result<String, TokenError> {
        self.decode_at(token, self.clock.now())
    }

    /// Same as [`Self::decode`] with an explicit current time.
    ///
    /// # Errors
    /// See [`Self::decode`].
    pub fn decode_at(&self, token: &str, now: i64) -> Result<String, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::Malformed)?;
        let claims_b64 = parts.next().ok_or(TokenError::Malformed)?;
        let sig_b64 = parts.next().ok_or(TokenError::Malformed)?;
        if parts.next().is_some() {
            return Err(TokenError::Malformed);
        }

        let header: Header = b64d_json(header_b64)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::Malformed);
        }

        let signature_bytes =
            Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Malformed)?;
        let signature =
            Signature::try_from(signature_bytes.as_slice()).map_err(|_| TokenError::Malformed)?;
        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
        self.keys
            .verifying_key()
            .verify(signing_input.as_bytes(), &signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = b64d_json(claims_b64)?;
        if now > claims.exp {
            debug!(exp = claims.exp, now, "token expired");
            return Err(TokenError::Expired { subject: claims.sub });
        }

        Ok(claims.sub)
    }

    /// Succeed only if `token` decodes to exactly `expected_subject`.
    ///
    /// # Errors
    /// `Unauthorized` with the decode failure as cause, or without a cause on
    /// subject mismatch.
    pub fn authorize(&self, expected_subject: &str, token: &str) -> Result<(), AuthError> {
        let subject = self
            .decode(token)
            .map_err(|err| AuthError::Unauthorized { cause: Some(err) })?;
        if subject != expected_subject {
            return Err(AuthError::Unauthorized { cause: None });
        }
        Ok(())
    }
}
