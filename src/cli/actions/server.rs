use crate::{
    admin::{AdminService, AdminStore, MemoryAdminStore, PgAdminStore},
    api::{self, AppState},
    auth::{KeyMaterial, PasswordHasher, TokenIssuer, TokenVerifier},
    cli::telemetry,
    clock::{Clock, SystemClock},
    mail::{HttpMailer, LogMailer, Mailer},
    storage,
    submission::{
        MemorySubmissionStore, OpenSurveyGate, PgSubmissionStore, SubmissionLifecycle,
        SubmissionStore, sweeper::spawn_sweeper,
    },
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub public_rsa_key: String,
    pub private_rsa_key: SecretString,
    pub frontend_base_url: String,
    pub verification_ttl_seconds: u64,
    pub session_ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<SecretString>,
    pub mail_sender: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the key pair is invalid, the database is unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let keys = Arc::new(
        KeyMaterial::from_base64(&args.public_rsa_key, args.private_rsa_key.expose_secret())
            .context("Invalid RSA key material")?,
    );
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let issuer = TokenIssuer::new(keys.clone(), clock.clone());
    let verifier = TokenVerifier::new(keys, clock.clone());

    let (submission_store, admin_store): (Arc<dyn SubmissionStore>, Arc<dyn AdminStore>) =
        if let Some(dsn) = &args.dsn {
            let pool = storage::connect(dsn).await?;
            storage::apply_schema(&pool).await?;
            (
                Arc::new(PgSubmissionStore::new(pool.clone())),
                Arc::new(PgAdminStore::new(pool)),
            )
        } else {
            warn!("No DSN configured, admins and submissions are kept in memory");
            (
                Arc::new(MemorySubmissionStore::new()),
                Arc::new(MemoryAdminStore::new()),
            )
        };

    let lifecycle = Arc::new(
        SubmissionLifecycle::new(
            submission_store,
            Arc::new(OpenSurveyGate),
            issuer.clone(),
            verifier.clone(),
            clock,
        )
        .with_verification_ttl(Duration::from_secs(args.verification_ttl_seconds)),
    );
    let admins = AdminService::new(admin_store, PasswordHasher::default(), issuer, verifier)
        .with_session_ttl(Duration::from_secs(args.session_ttl_seconds));

    let mailer: Arc<dyn Mailer> = match (args.mail_api_url, args.mail_api_key) {
        (Some(url), Some(key)) => Arc::new(HttpMailer::new(&url, key, args.mail_sender)?),
        _ => {
            info!("No mail API configured, verification links are only logged");
            Arc::new(LogMailer)
        }
    };

    let sweeper = spawn_sweeper(
        lifecycle.clone(),
        Duration::from_secs(args.sweep_interval_seconds),
    );

    let state = Arc::new(AppState::new(
        admins,
        lifecycle,
        mailer,
        args.frontend_base_url,
    ));
    let result = api::new(args.port, state).await;

    sweeper.abort();
    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "dsn",
            args.dsn
                .as_deref()
                .map_or_else(|| "none (in-memory)".to_string(), redact_dsn),
        ),
        ("frontend_base_url", args.frontend_base_url.clone()),
        (
            "verification_ttl_seconds",
            args.verification_ttl_seconds.to_string(),
        ),
        ("session_ttl_seconds", args.session_ttl_seconds.to_string()),
        (
            "sweep_interval_seconds",
            args.sweep_interval_seconds.to_string(),
        ),
        (
            "mail_api_url",
            args.mail_api_url
                .clone()
                .unwrap_or_else(|| "none (log only)".to_string()),
        ),
    ];
    log_entries("Startup configuration", &entries);
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\n{title}:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
