//! Survey administrators: registration, password login, and session checks.

pub mod store;

pub use store::{AdminStore, InsertOutcome, MemoryAdminStore, PgAdminStore};

use anyhow::{Context, anyhow};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tokio::task::spawn_blocking;
use tracing::{info, instrument, warn};

use crate::auth::{
    AuthError, PasswordHasher, Scope, Token, TokenIssuer, TokenVerifier, validate_password,
};

const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(2 * 60 * 60);

// Unknown usernames are checked against a hash of this so both login paths cost the same.
const DUMMY_PASSWORD: &str = "fastsurvey-unknown-admin";

/// Stored admin account. Only the hash of the password is ever kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password_hash: String,
    pub created_at: i64,
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("invalid username")]
    InvalidUsername,
    #[error("invalid password format")]
    InvalidPassword,
    #[error("username already taken")]
    Conflict,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("admin not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Usernames double as path segments: lowercase letters, digits and dashes.
#[must_use]
pub fn valid_username(username: &str) -> bool {
    Regex::new(r"^[a-z0-9][a-z0-9-]{1,31}$").is_ok_and(|regex| regex.is_match(username))
}

pub struct AdminService {
    store: Arc<dyn AdminStore>,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    session_ttl: Duration,
    dummy_hash: OnceCell<String>,
}

impl AdminService {
    #[must_use]
    pub fn new(
        store: Arc<dyn AdminStore>,
        hasher: PasswordHasher,
        issuer: TokenIssuer,
        verifier: TokenVerifier,
    ) -> Self {
        Self {
            store,
            hasher,
            issuer,
            verifier,
            session_ttl: DEFAULT_SESSION_TTL,
            dummy_hash: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Create an admin account.
    ///
    /// # Errors
    /// Returns an error if the username or password is invalid, the username
    /// is taken, or hashing/storage fails.
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<Credential, AdminError> {
        if !valid_username(username) {
            return Err(AdminError::InvalidUsername);
        }
        if !validate_password(password) {
            return Err(AdminError::InvalidPassword);
        }

        let password_hash = self.hash_password(password).await?;
        let credential = Credential {
            username: username.to_string(),
            password_hash,
            created_at: self.issuer.now(),
        };

        match self.store.insert(&credential).await? {
            InsertOutcome::Created => {
                info!("admin registered");
                Ok(credential)
            }
            InsertOutcome::Conflict => Err(AdminError::Conflict),
        }
    }

    /// Check the password and issue a session token.
    ///
    /// # Errors
    /// `InvalidCredentials` for an unknown user or wrong password.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Token, AdminError> {
        let Some(credential) = self.store.find(username).await? else {
            let dummy_hash = self
                .dummy_hash
                .get_or_try_init(|| self.hash_password(DUMMY_PASSWORD))
                .await?;
            self.verify_password(password, dummy_hash).await?;
            return Err(AdminError::InvalidCredentials);
        };
        if !self
            .verify_password(password, &credential.password_hash)
            .await?
        {
            return Err(AdminError::InvalidCredentials);
        }

        if self.hasher.needs_rehash(&credential.password_hash) {
            match self.hash_password(password).await {
                Ok(upgraded) => {
                    if let Err(err) = self.store.update_hash(username, &upgraded).await {
                        warn!("failed to store upgraded password hash: {err}");
                    }
                }
                Err(err) => warn!("failed to upgrade password hash: {err}"),
            }
        }

        let token = self
            .issuer
            .issue(&Scope::Session.subject(username), self.session_ttl)?;
        Ok(token)
    }

    // Argon2 is CPU bound, keep it off the async workers.
    async fn hash_password(&self, password: &str) -> Result<String, AdminError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = spawn_blocking(move || hasher.hash(&password))
            .await
            .context("password hashing task failed")?
            .map_err(|err| anyhow!("failed to hash password: {err}"))?;
        Ok(hash)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AdminError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        let matches = spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .context("password verification task failed")?;
        Ok(matches)
    }

    /// Allow the request only if `token` is a live session of `username`.
    ///
    /// # Errors
    /// `Unauthorized` otherwise.
    pub fn authorize(&self, username: &str, token: &str) -> Result<(), AuthError> {
        self.verifier
            .authorize(&Scope::Session.subject(username), token)
    }

    /// # Errors
    /// `NotFound` if no such admin exists.
    pub async fn fetch(&self, username: &str) -> Result<Credential, AdminError> {
        self.store
            .find(username)
            .await?
            .ok_or(AdminError::NotFound)
    }
}
