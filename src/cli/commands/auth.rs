use clap::{Arg, ArgMatches, Command};

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_VERIFICATION_TTL_SECONDS: &str = "verification-ttl-seconds";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SWEEP_INTERVAL_SECONDS: &str = "sweep-interval-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub frontend_base_url: String,
    pub verification_ttl_seconds: u64,
    pub session_ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Options {
    /// Parse token lifetime and link arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a lifetime is zero.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let seconds = |id: &str| matches.get_one::<u64>(id).copied().unwrap_or(0);

        let options = Self {
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .unwrap_or_default(),
            verification_ttl_seconds: seconds(ARG_VERIFICATION_TTL_SECONDS),
            session_ttl_seconds: seconds(ARG_SESSION_TTL_SECONDS),
            sweep_interval_seconds: seconds(ARG_SWEEP_INTERVAL_SECONDS),
        };

        if options.verification_ttl_seconds == 0 {
            anyhow::bail!("--{ARG_VERIFICATION_TTL_SECONDS} must be greater than zero");
        }
        if options.session_ttl_seconds == 0 {
            anyhow::bail!("--{ARG_SESSION_TTL_SECONDS} must be greater than zero");
        }

        Ok(options)
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL used for verification links")
                .env("FASTSURVEY_FRONTEND_BASE_URL")
                .default_value("https://fastsurvey.io"),
        )
        .arg(
            Arg::new(ARG_VERIFICATION_TTL_SECONDS)
                .long(ARG_VERIFICATION_TTL_SECONDS)
                .help("Submission verification token TTL in seconds")
                .env("FASTSURVEY_VERIFICATION_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Admin session token TTL in seconds")
                .env("FASTSURVEY_SESSION_TTL_SECONDS")
                .default_value("7200")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_SWEEP_INTERVAL_SECONDS)
                .long(ARG_SWEEP_INTERVAL_SECONDS)
                .help("Interval between sweeps that expire stale pending submissions")
                .env("FASTSURVEY_SWEEP_INTERVAL_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
}
