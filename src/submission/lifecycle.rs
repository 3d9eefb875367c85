use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::error::LifecycleError;
use super::gate::{GateDecision, SurveyGate};
use super::store::SubmissionStore;
use super::{Status, Submission};
use crate::auth::{Scope, Token, TokenError, TokenIssuer, TokenVerifier};
use crate::clock::Clock;
use crate::mail::valid_email;

const DEFAULT_VERIFICATION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A stored pending submission and the token that confirms it.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub submission: Submission,
    pub token: Token,
}

pub struct SubmissionLifecycle {
    store: Arc<dyn SubmissionStore>,
    gate: Arc<dyn SurveyGate>,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    clock: Arc<dyn Clock>,
    verification_ttl: Duration,
}

impl SubmissionLifecycle {
    #[must_use]
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        gate: Arc<dyn SurveyGate>,
        issuer: TokenIssuer,
        verifier: TokenVerifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            gate,
            issuer,
            verifier,
            clock,
            verification_ttl: DEFAULT_VERIFICATION_TTL,
        }
    }

    #[must_use]
    pub fn with_verification_ttl(mut self, ttl: Duration) -> Self {
        self.verification_ttl = ttl;
        self
    }

    #[must_use]
    pub fn verification_ttl(&self) -> Duration {
        self.verification_ttl
    }

    pub fn store(&self) -> &dyn SubmissionStore {
        self.store.as_ref()
    }

    /// Store a new pending submission and issue its verification token.
    ///
    /// # Errors
    /// `InvalidEmail` or `InvalidSubmission` if the input is rejected, `Store`
    /// if signing or persistence fails. Nothing is stored on error.
    #[instrument(skip(self, answers), fields(submission_id))]
    pub async fn accept(
        &self,
        survey_id: &str,
        email: &str,
        answers: Value,
    ) -> Result<Accepted, LifecycleError> {
        if !valid_email(email) {
            return Err(LifecycleError::InvalidEmail);
        }
        if let GateDecision::Reject(reason) = self.gate.check(survey_id, &answers) {
            return Err(LifecycleError::InvalidSubmission(reason));
        }

        let id = Uuid::new_v4();
        tracing::Span::current().record("submission_id", tracing::field::display(id));

        let subject = Scope::Verification.subject(&id.to_string());
        let token = self.issuer.issue(&subject, self.verification_ttl)?;

        let submission = Submission {
            id,
            survey_id: survey_id.to_string(),
            email: email.to_string(),
            answers,
            status: Status::Pending,
            verification_subject: subject,
            created_at: token.issued_at,
        };
        self.store.insert_pending(&submission).await?;

        info!("submission accepted, awaiting verification");

        Ok(Accepted { submission, token })
    }

    /// Confirm a submission with its verification token.
    ///
    /// # Errors
    /// - `VerificationExpired` if the token expired; the pending submission is
    ///   moved to `Expired`.
    /// - `InvalidVerificationToken` if the token does not verify or is not a
    ///   verification token.
    /// - `UnknownOrAlreadyProcessedSubmission` if no pending submission
    ///   matches, including the loser of a concurrent confirmation.
    #[instrument(skip_all)]
    pub async fn confirm(&self, token: &str) -> Result<Submission, LifecycleError> {
        self.confirm_scoped(None, token).await
    }

    /// Like [`confirm`](Self::confirm), but only for a submission of `survey_id`.
    /// A token of another survey reports `UnknownOrAlreadyProcessedSubmission`
    /// and leaves that submission untouched.
    ///
    /// # Errors
    /// Same as `confirm`.
    #[instrument(skip(self, token))]
    pub async fn confirm_in(
        &self,
        survey_id: &str,
        token: &str,
    ) -> Result<Submission, LifecycleError> {
        self.confirm_scoped(Some(survey_id), token).await
    }

    async fn confirm_scoped(
        &self,
        survey_id: Option<&str>,
        token: &str,
    ) -> Result<Submission, LifecycleError> {
        let subject = match self.verifier.decode(token) {
            Ok(subject) => subject,
            Err(TokenError::Expired { subject }) => {
                let id = submission_id(&subject)?;
                self.ensure_survey(id, survey_id).await?;
                return if self
                    .store
                    .transition(id, Status::Pending, Status::Expired)
                    .await?
                {
                    info!(submission_id = %id, "verification window elapsed");
                    Err(LifecycleError::VerificationExpired)
                } else {
                    Err(LifecycleError::UnknownOrAlreadyProcessedSubmission)
                };
            }
            Err(err) => {
                debug!("verification token rejected: {err}");
                return Err(LifecycleError::InvalidVerificationToken);
            }
        };

        let id = submission_id(&subject)?;
        self.ensure_survey(id, survey_id).await?;
        if !self
            .store
            .transition(id, Status::Pending, Status::Verified)
            .await?
        {
            return Err(LifecycleError::UnknownOrAlreadyProcessedSubmission);
        }

        info!(submission_id = %id, "submission verified");

        let submission = self
            .store
            .find(id)
            .await?
            .ok_or(LifecycleError::UnknownOrAlreadyProcessedSubmission)?;
        Ok(submission)
    }

    async fn ensure_survey(&self, id: Uuid, survey_id: Option<&str>) -> Result<(), LifecycleError> {
        let Some(expected) = survey_id else {
            return Ok(());
        };
        match self.store.find(id).await? {
            Some(submission) if submission.survey_id == expected => Ok(()),
            _ => {
                debug!(submission_id = %id, "verification token used for another survey");
                Err(LifecycleError::UnknownOrAlreadyProcessedSubmission)
            }
        }
    }

    /// Move a pending submission to `Expired`. Returns `false` if it was not pending.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn expire(&self, id: Uuid) -> Result<bool, LifecycleError> {
        Ok(self
            .store
            .transition(id, Status::Pending, Status::Expired)
            .await?)
    }

    /// Expire every pending submission whose verification window has closed.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn sweep(&self) -> Result<usize, LifecycleError> {
        let ttl = i64::try_from(self.verification_ttl.as_secs()).unwrap_or(i64::MAX);
        let cutoff = self.clock.now().saturating_sub(ttl);

        let mut expired = 0;
        for id in self.store.pending_created_before(cutoff).await? {
            match self.expire(id).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(err) => warn!(submission_id = %id, "failed to expire submission: {err}"),
            }
        }
        Ok(expired)
    }

    /// Verified submissions of a survey; pending and expired ones are never returned.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn verified(&self, survey_id: &str) -> Result<Vec<Submission>, LifecycleError> {
        Ok(self.store.verified(survey_id).await?)
    }
}

fn submission_id(subject: &str) -> Result<Uuid, LifecycleError> {
    Scope::Verification
        .strip(subject)
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or(LifecycleError::InvalidVerificationToken)
}
