//! Submission intake and email verification endpoints.

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::lifecycle_error_response;
use crate::api::state::AppState;
use crate::mail::{dispatch, verification_link};
use crate::submission::{Status, Submission, survey_id};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SubmitRequest {
    pub email: String,
    #[schema(value_type = Object)]
    pub answers: Value,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub status: Status,
}

impl From<&Submission> for SubmissionResponse {
    fn from(submission: &Submission) -> Self {
        Self {
            id: submission.id,
            status: submission.status,
        }
    }
}

/// Store a pending submission and mail its verification link.
#[utoipa::path(
    post,
    path = "/surveys/{admin}/{survey}/submissions",
    request_body = SubmitRequest,
    params(
        ("admin" = String, Path, description = "The name of the admin"),
        ("survey" = String, Path, description = "The name of the survey")
    ),
    responses(
        (status = 201, description = "Submission stored, awaiting verification", body = SubmissionResponse),
        (status = 400, description = "Missing payload", body = String),
        (status = 422, description = "Invalid email or answers", body = String)
    ),
    tag = "submissions"
)]
#[instrument(skip(state, payload))]
pub async fn submit(
    Path((admin, survey)): Path<(String, String)>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<SubmitRequest>>,
) -> impl IntoResponse {
    let request: SubmitRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let accepted = match state
        .lifecycle()
        .accept(&survey_id(&admin, &survey), &request.email, request.answers)
        .await
    {
        Ok(accepted) => accepted,
        Err(err) => return lifecycle_error_response(&err).into_response(),
    };

    match verification_link(
        state.frontend_base_url(),
        &admin,
        &survey,
        &accepted.token.value,
    ) {
        // The response does not wait for delivery.
        Ok(link) => {
            dispatch(state.mailer(), request.email, link);
        }
        Err(err) => error!("Failed to build verification link: {err:#}"),
    }

    (
        StatusCode::CREATED,
        Json(SubmissionResponse::from(&accepted.submission)),
    )
        .into_response()
}

/// Confirm a submission through the token from its verification mail.
#[utoipa::path(
    get,
    path = "/surveys/{admin}/{survey}/verification/{token}",
    params(
        ("admin" = String, Path, description = "The name of the admin"),
        ("survey" = String, Path, description = "The name of the survey"),
        ("token" = String, Path, description = "The verification token")
    ),
    responses(
        (status = 200, description = "Submission verified", body = SubmissionResponse),
        (status = 400, description = "Invalid verification token", body = String),
        (status = 404, description = "Submission not found, already processed or of another survey", body = String),
        (status = 410, description = "Verification expired", body = String)
    ),
    tag = "submissions"
)]
#[instrument(skip(state, token))]
pub async fn verify(
    Path((admin, survey, token)): Path<(String, String, String)>,
    state: Extension<Arc<AppState>>,
) -> impl IntoResponse {
    match state
        .lifecycle()
        .confirm_in(&survey_id(&admin, &survey), &token)
        .await
    {
        Ok(submission) => (StatusCode::OK, Json(SubmissionResponse::from(&submission))).into_response(),
        Err(err) => lifecycle_error_response(&err).into_response(),
    }
}
