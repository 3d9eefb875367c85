//! Admin credential persistence.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::Instrument;

use super::Credential;

#[derive(Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    Conflict,
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn find(&self, username: &str) -> Result<Option<Credential>>;
    async fn insert(&self, credential: &Credential) -> Result<InsertOutcome>;
    async fn update_hash(&self, username: &str, password_hash: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryAdminStore {
    admins: Mutex<HashMap<String, Credential>>,
}

impl MemoryAdminStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdminStore for MemoryAdminStore {
    async fn find(&self, username: &str) -> Result<Option<Credential>> {
        Ok(self.admins.lock().await.get(username).cloned())
    }

    async fn insert(&self, credential: &Credential) -> Result<InsertOutcome> {
        let mut guard = self.admins.lock().await;
        if guard.contains_key(&credential.username) {
            return Ok(InsertOutcome::Conflict);
        }
        guard.insert(credential.username.clone(), credential.clone());
        Ok(InsertOutcome::Created)
    }

    async fn update_hash(&self, username: &str, password_hash: &str) -> Result<()> {
        if let Some(credential) = self.admins.lock().await.get_mut(username) {
            credential.password_hash = password_hash.to_string();
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct PgAdminStore {
    pool: PgPool,
}

impl PgAdminStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}

#[async_trait]
impl AdminStore for PgAdminStore {
    async fn find(&self, username: &str) -> Result<Option<Credential>> {
        let query = "SELECT username, password_hash, created_at FROM admins WHERE username = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup admin")?;

        Ok(row.map(|row| Credential {
            username: row.get("username"),
            password_hash: row.get("password_hash"),
            created_at: row.get("created_at"),
        }))
    }

    async fn insert(&self, credential: &Credential) -> Result<InsertOutcome> {
        let query = "INSERT INTO admins (username, password_hash, created_at) VALUES ($1, $2, $3)";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(&credential.username)
            .bind(&credential.password_hash)
            .bind(credential.created_at)
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Created),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert admin"),
        }
    }

    async fn update_hash(&self, username: &str, password_hash: &str) -> Result<()> {
        let query = "UPDATE admins SET password_hash = $2 WHERE username = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update admin password hash")?;
        Ok(())
    }
}
