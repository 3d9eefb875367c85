//! # FastSurvey (submission verification & admin authentication)
//!
//! `fastsurvey` collects survey submissions that only count once the submitter
//! confirms them through an emailed verification link. Survey administrators
//! authenticate with a password and receive a short-lived bearer token.
//!
//! ## Tokens
//!
//! Every token is an RS256-signed JWT with the claims `iss`, `sub`, `iat` and
//! `exp`. The private key signs, the public key verifies; both are loaded once
//! at startup and never change while the process runs. Subjects are namespaced
//! by [`auth::Scope`] so a verification token can never be replayed as an admin
//! session and vice versa.
//!
//! ## Submissions
//!
//! A submission starts `pending`. Confirming its verification token moves it to
//! `verified` exactly once through a compare-and-swap on the stored status; an
//! expired token moves it to `expired` instead. Only `verified` submissions are
//! visible to the results reader.

pub mod admin;
pub mod api;
pub mod auth;
pub mod cli;
pub mod clock;
pub mod mail;
pub mod storage;
pub mod submission;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
