//! Verification mail delivery.
//!
//! The submission handler hands each verification link to a `Mailer` on a
//! spawned task, so the HTTP response never waits on delivery. Retrying is the
//! mailer's job: `HttpMailer` retries failed requests with exponential backoff
//! and jitter, then gives up and logs.
//!
//! `LogMailer` is the local-dev default; it logs the link and returns `Ok(())`.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{Instrument, error, info, info_span, warn};
use url::Url;

const SUBJECT: &str = "Confirm your survey submission";

/// Basic email format check.
#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

/// Build the link a submitter follows to confirm their submission.
///
/// # Errors
/// Returns an error if the base URL is invalid.
pub fn verification_link(
    frontend_base_url: &str,
    admin_name: &str,
    survey_name: &str,
    token: &str,
) -> Result<String> {
    let mut url = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    url.path_segments_mut()
        .map_err(|()| anyhow!("Frontend base URL cannot be a base: {frontend_base_url}"))?
        .pop_if_empty()
        .extend([admin_name, survey_name, "verification", token]);
    Ok(url.to_string())
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, verification_link: &str) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, recipient: &str, verification_link: &str) -> Result<()> {
        info!(
            to_email = %recipient,
            link = %verification_link,
            "verification mail send stub"
        );
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl RetryPolicy {
    /// 3 attempts with 1s->30s exponential backoff and jitter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max.max(base);
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends through a Mailgun-style HTTP API: form POST with basic auth.
pub struct HttpMailer {
    client: Client,
    api_url: Url,
    api_key: SecretString,
    sender: String,
    retry: RetryPolicy,
}

impl HttpMailer {
    /// # Errors
    /// Returns an error if the API URL is invalid or the HTTP client cannot be built.
    pub fn new(api_url: &str, api_key: SecretString, sender: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build mail client")?;
        Ok(Self {
            client,
            api_url: Url::parse(api_url).with_context(|| format!("Invalid mail API URL: {api_url}"))?,
            api_key,
            sender,
            retry: RetryPolicy::new(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn post(&self, recipient: &str, verification_link: &str) -> Result<()> {
        let text = format!(
            "Please confirm your survey submission by opening this link:\n\n{verification_link}\n"
        );
        let form = [
            ("from", self.sender.as_str()),
            ("to", recipient),
            ("subject", SUBJECT),
            ("text", text.as_str()),
        ];

        let response = self
            .client
            .post(self.api_url.clone())
            .basic_auth("api", Some(self.api_key.expose_secret()))
            .form(&form)
            .send()
            .await
            .context("mail API request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{} - {}", self.api_url, status));
        }
        Ok(())
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, recipient: &str, verification_link: &str) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.post(recipient, verification_link).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < self.retry.max_attempts => {
                    let delay =
                        backoff_delay(attempt, self.retry.backoff_base, self.retry.backoff_max);
                    warn!(attempt, ?delay, "verification mail failed, retrying: {err}");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.context(format!("gave up after {attempt} attempts"))),
            }
        }
    }
}

/// Deliver on a separate task; failures are logged, never returned.
pub fn dispatch(
    mailer: Arc<dyn Mailer>,
    recipient: String,
    verification_link: String,
) -> tokio::task::JoinHandle<()> {
    let span = info_span!("mail.send", to_email = %recipient);
    tokio::spawn(
        async move {
            if let Err(err) = mailer.send(&recipient, &verification_link).await {
                error!("failed to send verification mail: {err:#}");
            }
        }
        .instrument(span),
    )
}

fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let shift = attempt.saturating_sub(1).min(31);
    let factor = 1u32 << shift;
    let delay = base.checked_mul(factor).unwrap_or(max);
    let capped = if delay > max { max } else { delay };
    jitter_delay(capped)
}

fn jitter_delay(delay: Duration) -> Duration {
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    if delay_ms < 2 {
        return delay;
    }
    let half = delay_ms / 2;
    let jitter = rand::thread_rng().gen_range(0..=half);
    Duration::from_millis(half + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
        assert!(!valid_email("white space@example.com"));
    }

    #[test]
    fn verification_link_appends_segments() -> Result<()> {
        let link = verification_link("https://fastsurvey.io/", "ada", "s1", "a.b.c")?;
        assert_eq!(link, "https://fastsurvey.io/ada/s1/verification/a.b.c");

        let link = verification_link("https://fastsurvey.io/app", "ada", "s1", "t")?;
        assert_eq!(link, "https://fastsurvey.io/app/ada/s1/verification/t");
        Ok(())
    }

    #[test]
    fn verification_link_rejects_bad_base() {
        assert!(verification_link("not a url", "ada", "s1", "t").is_err());
        assert!(verification_link("mailto:ada@example.com", "ada", "s1", "t").is_err());
    }

    #[test]
    fn backoff_grows_and_caps() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(30);
        for attempt in 1..10 {
            let delay = backoff_delay(attempt, base, max);
            assert!(delay <= max);
        }
        let third = backoff_delay(3, base, max);
        assert!(third >= Duration::from_secs(2) && third <= Duration::from_secs(4));
    }

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Mailer for Recording {
        async fn send(&self, recipient: &str, verification_link: &str) -> Result<()> {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push((recipient.to_string(), verification_link.to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_runs_mailer() -> Result<()> {
        let mailer = Arc::new(Recording::default());
        dispatch(
            mailer.clone(),
            "someone@example.com".to_string(),
            "https://fastsurvey.io/x".to_string(),
        )
        .await?;

        let sent = mailer.sent.lock().map_err(|_| anyhow!("poisoned"))?.clone();
        assert_eq!(
            sent,
            vec![(
                "someone@example.com".to_string(),
                "https://fastsurvey.io/x".to_string()
            )]
        );
        Ok(())
    }

    #[tokio::test]
    async fn log_mailer_succeeds() -> Result<()> {
        LogMailer.send("someone@example.com", "https://fastsurvey.io/x").await
    }
}
