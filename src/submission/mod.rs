//! Survey submissions and their verification lifecycle.
//!
//! ```text
//! accept ──> Pending ──confirm──> Verified
//!               │
//!               └──expired token / sweep──> Expired
//! ```
//!
//! Both transitions out of `Pending` go through [`SubmissionStore::transition`],
//! a compare-and-swap on the stored status, so concurrent confirmations of one
//! submission produce exactly one winner.

pub mod error;
pub mod gate;
pub mod lifecycle;
pub mod postgres;
pub mod store;
pub mod sweeper;

pub use error::LifecycleError;
pub use gate::{GateDecision, OpenSurveyGate, SurveyGate};
pub use lifecycle::{Accepted, SubmissionLifecycle};
pub use postgres::PgSubmissionStore;
pub use store::{MemorySubmissionStore, SubmissionStore};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Verified,
    Expired,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Expired => "expired",
        }
    }

    /// Only `Pending` ever moves, and only to a terminal state.
    #[must_use]
    pub const fn can_transition(from: Self, to: Self) -> bool {
        matches!(
            (from, to),
            (Self::Pending, Self::Verified) | (Self::Pending, Self::Expired)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "expired" => Ok(Self::Expired),
            other => Err(anyhow::anyhow!("unknown submission status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub survey_id: String,
    pub email: String,
    pub answers: Value,
    pub status: Status,
    pub verification_subject: String,
    pub created_at: i64,
}

/// Surveys are addressed as `<admin>/<survey>`.
#[must_use]
pub fn survey_id(admin_name: &str, survey_name: &str) -> String {
    format!("{admin_name}/{survey_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() -> anyhow::Result<()> {
        for status in [Status::Pending, Status::Verified, Status::Expired] {
            assert_eq!(status.as_str().parse::<Status>()?, status);
        }
        assert!("approved".parse::<Status>().is_err());
        Ok(())
    }

    #[test]
    fn only_pending_moves() {
        assert!(Status::can_transition(Status::Pending, Status::Verified));
        assert!(Status::can_transition(Status::Pending, Status::Expired));
        assert!(!Status::can_transition(Status::Verified, Status::Pending));
        assert!(!Status::can_transition(Status::Verified, Status::Expired));
        assert!(!Status::can_transition(Status::Expired, Status::Verified));
        assert!(!Status::can_transition(Status::Pending, Status::Pending));
    }

    #[test]
    fn status_serializes_lowercase() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_string(&Status::Verified)?, "\"verified\"");
        Ok(())
    }
}
