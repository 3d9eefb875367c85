//! Submission persistence interface and the in-memory store.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Status, Submission};

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Persist a new submission. Its status must be `Pending`.
    async fn insert_pending(&self, submission: &Submission) -> Result<()>;

    async fn find_pending(&self, id: Uuid) -> Result<Option<Submission>>;

    async fn find(&self, id: Uuid) -> Result<Option<Submission>>;

    /// Atomically set the status to `to` if it is currently `from`.
    /// Returns `false` when the precondition did not hold.
    async fn transition(&self, id: Uuid, from: Status, to: Status) -> Result<bool>;

    /// Ids of pending submissions created strictly before `cutoff`.
    async fn pending_created_before(&self, cutoff: i64) -> Result<Vec<Uuid>>;

    /// Verified submissions of a survey, oldest first.
    async fn verified(&self, survey_id: &str) -> Result<Vec<Submission>>;

    async fn ping(&self) -> Result<()>;
}

pub(crate) fn check_transition(from: Status, to: Status) -> Result<()> {
    if Status::can_transition(from, to) {
        Ok(())
    } else {
        Err(anyhow!("invalid submission transition: {from} -> {to}"))
    }
}

/// Store backed by a map behind a single lock; every compare-and-swap runs
/// under that lock.
#[derive(Debug, Default)]
pub struct MemorySubmissionStore {
    submissions: Mutex<HashMap<Uuid, Submission>>,
}

impl MemorySubmissionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn insert_pending(&self, submission: &Submission) -> Result<()> {
        if submission.status != Status::Pending {
            return Err(anyhow!("only pending submissions can be inserted"));
        }
        let mut guard = self.submissions.lock().await;
        if guard.contains_key(&submission.id) {
            return Err(anyhow!("submission {} already exists", submission.id));
        }
        guard.insert(submission.id, submission.clone());
        Ok(())
    }

    async fn find_pending(&self, id: Uuid) -> Result<Option<Submission>> {
        let guard = self.submissions.lock().await;
        Ok(guard
            .get(&id)
            .filter(|submission| submission.status == Status::Pending)
            .cloned())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Submission>> {
        let guard = self.submissions.lock().await;
        Ok(guard.get(&id).cloned())
    }

    async fn transition(&self, id: Uuid, from: Status, to: Status) -> Result<bool> {
        check_transition(from, to)?;
        let mut guard = self.submissions.lock().await;
        match guard.get_mut(&id) {
            Some(submission) if submission.status == from => {
                submission.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn pending_created_before(&self, cutoff: i64) -> Result<Vec<Uuid>> {
        let guard = self.submissions.lock().await;
        Ok(guard
            .values()
            .filter(|s| s.status == Status::Pending && s.created_at < cutoff)
            .map(|s| s.id)
            .collect())
    }

    async fn verified(&self, survey_id: &str) -> Result<Vec<Submission>> {
        let guard = self.submissions.lock().await;
        let mut verified: Vec<Submission> = guard
            .values()
            .filter(|s| s.status == Status::Verified && s.survey_id == survey_id)
            .cloned()
            .collect();
        verified.sort_by_key(|s| (s.created_at, s.id));
        Ok(verified)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending(survey_id: &str, created_at: i64) -> Submission {
        let id = Uuid::new_v4();
        Submission {
            id,
            survey_id: survey_id.to_string(),
            email: "someone@example.com".to_string(),
            answers: json!({"q1": "a"}),
            status: Status::Pending,
            verification_subject: format!("submission:{id}"),
            created_at,
        }
    }

    #[tokio::test]
    async fn transition_is_compare_and_swap() -> Result<()> {
        let store = MemorySubmissionStore::new();
        let submission = pending("ada/s1", 10);
        store.insert_pending(&submission).await?;

        assert!(
            store
                .transition(submission.id, Status::Pending, Status::Verified)
                .await?
        );
        assert!(
            !store
                .transition(submission.id, Status::Pending, Status::Verified)
                .await?
        );
        assert!(
            !store
                .transition(submission.id, Status::Pending, Status::Expired)
                .await?
        );
        assert_eq!(store.find_pending(submission.id).await?, None);
        assert_eq!(
            store.find(submission.id).await?.map(|s| s.status),
            Some(Status::Verified)
        );
        Ok(())
    }

    #[tokio::test]
    async fn transition_rejects_backwards_moves() -> Result<()> {
        let store = MemorySubmissionStore::new();
        let submission = pending("ada/s1", 10);
        store.insert_pending(&submission).await?;

        assert!(
            store
                .transition(submission.id, Status::Verified, Status::Pending)
                .await
                .is_err()
        );
        Ok(())
    }

    #[tokio::test]
    async fn unknown_id_does_not_transition() -> Result<()> {
        let store = MemorySubmissionStore::new();
        assert!(
            !store
                .transition(Uuid::new_v4(), Status::Pending, Status::Verified)
                .await?
        );
        Ok(())
    }

    #[tokio::test]
    async fn insert_rejects_duplicates_and_non_pending() -> Result<()> {
        let store = MemorySubmissionStore::new();
        let submission = pending("ada/s1", 10);
        store.insert_pending(&submission).await?;
        assert!(store.insert_pending(&submission).await.is_err());

        let mut verified = pending("ada/s1", 10);
        verified.status = Status::Verified;
        assert!(store.insert_pending(&verified).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn verified_filters_by_survey_and_status() -> Result<()> {
        let store = MemorySubmissionStore::new();
        let first = pending("ada/s1", 20);
        let second = pending("ada/s1", 10);
        let other = pending("ada/s2", 10);
        let unconfirmed = pending("ada/s1", 5);
        for s in [&first, &second, &other, &unconfirmed] {
            store.insert_pending(s).await?;
        }
        for s in [&first, &second, &other] {
            store
                .transition(s.id, Status::Pending, Status::Verified)
                .await?;
        }

        let ids: Vec<Uuid> = store
            .verified("ada/s1")
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
        Ok(())
    }

    #[tokio::test]
    async fn pending_created_before_cutoff() -> Result<()> {
        let store = MemorySubmissionStore::new();
        let old = pending("ada/s1", 10);
        let fresh = pending("ada/s1", 100);
        store.insert_pending(&old).await?;
        store.insert_pending(&fresh).await?;

        assert_eq!(store.pending_created_before(100).await?, vec![old.id]);
        Ok(())
    }
}
