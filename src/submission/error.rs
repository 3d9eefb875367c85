use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),
    #[error("verification expired")]
    VerificationExpired,
    #[error("invalid verification token")]
    InvalidVerificationToken,
    #[error("submission not found or already processed")]
    UnknownOrAlreadyProcessedSubmission,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
