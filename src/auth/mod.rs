//! Password hashing, key material, and signed bearer tokens.

pub mod error;
pub mod keys;
pub mod password;
pub mod token;

pub use error::{AuthError, KeyError, TokenError};
pub use keys::KeyMaterial;
pub use password::{PasswordHasher, validate_password};
pub use token::{Claims, ISSUER, Scope, Token, TokenIssuer, TokenVerifier};
