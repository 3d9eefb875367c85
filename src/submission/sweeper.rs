//! Background task that expires pending submissions past their window.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

use super::lifecycle::SubmissionLifecycle;

pub fn spawn_sweeper(
    lifecycle: Arc<SubmissionLifecycle>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    let interval = if interval.is_zero() {
        Duration::from_secs(1)
    } else {
        interval
    };

    tokio::spawn(async move {
        loop {
            match lifecycle.sweep().await {
                Ok(0) => debug!("no stale submissions"),
                Ok(expired) => info!(expired, "expired stale submissions"),
                Err(err) => error!("submission sweep failed: {err}"),
            }

            sleep(interval).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::keys::tests::test_keys;
    use crate::auth::{TokenIssuer, TokenVerifier};
    use crate::clock::ManualClock;
    use crate::submission::{MemorySubmissionStore, OpenSurveyGate, Status};
    use anyhow::Result;
    use serde_json::json;

    #[tokio::test]
    async fn sweeper_expires_in_background() -> Result<()> {
        let keys = Arc::new(test_keys());
        let clock = Arc::new(ManualClock::new(1_000));
        let lifecycle = Arc::new(
            SubmissionLifecycle::new(
                Arc::new(MemorySubmissionStore::new()),
                Arc::new(OpenSurveyGate),
                TokenIssuer::new(keys.clone(), clock.clone()),
                TokenVerifier::new(keys, clock.clone()),
                clock.clone(),
            )
            .with_verification_ttl(Duration::from_secs(10)),
        );
        let accepted = lifecycle
            .accept("ada/s1", "someone@example.com", json!({"q1": "a"}))
            .await?;
        clock.advance(11);

        let handle = spawn_sweeper(lifecycle.clone(), Duration::from_millis(10));
        let mut status = None;
        for _ in 0..100 {
            status = lifecycle
                .store()
                .find(accepted.submission.id)
                .await?
                .map(|s| s.status);
            if status == Some(Status::Expired) {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert_eq!(status, Some(Status::Expired));
        Ok(())
    }
}
