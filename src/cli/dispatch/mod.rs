//! Map validated CLI arguments to the server action.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_DSN, ARG_PORT, auth, keys, mail};
use anyhow::Result;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .filter(|dsn| !dsn.trim().is_empty());

    let key_opts = keys::Options::parse(matches)?;
    let auth_opts = auth::Options::parse(matches)?;
    let mail_opts = mail::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        public_rsa_key: key_opts.public_rsa_key,
        private_rsa_key: key_opts.private_rsa_key,
        frontend_base_url: auth_opts.frontend_base_url,
        verification_ttl_seconds: auth_opts.verification_ttl_seconds,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        sweep_interval_seconds: auth_opts.sweep_interval_seconds,
        mail_api_url: mail_opts.api_url,
        mail_api_key: mail_opts.api_key,
        mail_sender: mail_opts.sender,
    }))
}
