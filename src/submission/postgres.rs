//! `PostgreSQL` submission store.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use sqlx::{Connection, PgPool, Row, postgres::PgRow};
use tracing::Instrument;
use uuid::Uuid;

use super::store::{SubmissionStore, check_transition};
use super::{Status, Submission};

#[derive(Clone, Debug)]
pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn submission_from_row(row: &PgRow) -> Result<Submission> {
    let answers: String = row.get("answers");
    let status: String = row.get("status");
    Ok(Submission {
        id: row.get("id"),
        survey_id: row.get("survey_id"),
        email: row.get("email"),
        answers: serde_json::from_str(&answers).context("invalid stored answers")?,
        status: status.parse()?,
        verification_subject: row.get("verification_subject"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn insert_pending(&self, submission: &Submission) -> Result<()> {
        if submission.status != Status::Pending {
            return Err(anyhow!("only pending submissions can be inserted"));
        }
        let query = r"
            INSERT INTO submissions
                (id, survey_id, email, answers, status, verification_subject, created_at)
            VALUES ($1, $2, $3, $4::jsonb, 'pending', $5, $6)
        ";
        let answers =
            serde_json::to_string(&submission.answers).context("failed to serialize answers")?;
        sqlx::query(query)
            .bind(submission.id)
            .bind(&submission.survey_id)
            .bind(&submission.email)
            .bind(answers)
            .bind(&submission.verification_subject)
            .bind(submission.created_at)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to insert pending submission")?;
        Ok(())
    }

    async fn find_pending(&self, id: Uuid) -> Result<Option<Submission>> {
        Ok(self
            .find(id)
            .await?
            .filter(|submission| submission.status == Status::Pending))
    }

    async fn find(&self, id: Uuid) -> Result<Option<Submission>> {
        let query = "SELECT id, survey_id, email, answers::text AS answers, status, verification_subject, created_at FROM submissions WHERE id = $1";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup submission")?;
        row.as_ref().map(submission_from_row).transpose()
    }

    async fn transition(&self, id: Uuid, from: Status, to: Status) -> Result<bool> {
        check_transition(from, to)?;
        // Single conditional UPDATE; the row lock serializes concurrent callers.
        let query = "UPDATE submissions SET status = $3 WHERE id = $1 AND status = $2";
        let result = sqlx::query(query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to transition submission")?;
        Ok(result.rows_affected() == 1)
    }

    async fn pending_created_before(&self, cutoff: i64) -> Result<Vec<Uuid>> {
        let query = "SELECT id FROM submissions WHERE status = 'pending' AND created_at < $1";
        let rows = sqlx::query(query)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to list stale submissions")?;
        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn verified(&self, survey_id: &str) -> Result<Vec<Submission>> {
        let query = "SELECT id, survey_id, email, answers::text AS answers, status, verification_subject, created_at FROM submissions WHERE survey_id = $1 AND status = 'verified' ORDER BY created_at ASC, id ASC";
        let rows = sqlx::query(query)
            .bind(survey_id)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to list verified submissions")?;
        rows.iter().map(submission_from_row).collect()
    }

    async fn ping(&self) -> Result<()> {
        let acquire_span = tracing::info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;
        conn.ping().await.context("failed to ping database")?;
        Ok(())
    }
}
