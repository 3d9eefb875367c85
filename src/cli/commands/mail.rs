use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_MAIL_API_URL: &str = "mail-api-url";
pub const ARG_MAIL_API_KEY: &str = "mail-api-key";
pub const ARG_MAIL_SENDER: &str = "mail-sender";

/// Mail delivery settings. Without an API URL, mails are only logged.
#[derive(Debug, Clone)]
pub struct Options {
    pub api_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub sender: String,
}

impl Options {
    /// Parse mail arguments from matches.
    ///
    /// # Errors
    /// Returns an error if an API URL is given without an API key.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let api_url = get_non_empty(ARG_MAIL_API_URL);
        let api_key = get_non_empty(ARG_MAIL_API_KEY).map(SecretString::from);
        if api_url.is_some() && api_key.is_none() {
            anyhow::bail!("--{ARG_MAIL_API_KEY} is required with --{ARG_MAIL_API_URL}");
        }

        Ok(Self {
            api_url,
            api_key,
            sender: get_non_empty(ARG_MAIL_SENDER)
                .unwrap_or_else(|| "FastSurvey <noreply@fastsurvey.io>".to_string()),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MAIL_API_URL)
                .long(ARG_MAIL_API_URL)
                .help("HTTP mail API endpoint, example: https://api.mailgun.net/v3/<domain>/messages")
                .env("FASTSURVEY_MAIL_API_URL"),
        )
        .arg(
            Arg::new(ARG_MAIL_API_KEY)
                .long(ARG_MAIL_API_KEY)
                .help("HTTP mail API key")
                .env("FASTSURVEY_MAIL_API_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_MAIL_SENDER)
                .long(ARG_MAIL_SENDER)
                .help("Sender address for verification mails")
                .env("FASTSURVEY_MAIL_SENDER")
                .default_value("FastSurvey <noreply@fastsurvey.io>"),
        )
}
