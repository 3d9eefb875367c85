use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use super::extract_bearer_token;
use crate::api::error::{auth_error_response, lifecycle_error_response};
use crate::api::state::AppState;
use crate::submission::survey_id;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifiedAnswers {
    pub id: Uuid,
    #[schema(value_type = Object)]
    pub answers: Value,
    pub created_at: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SurveyResults {
    pub survey_id: String,
    pub count: usize,
    pub submissions: Vec<VerifiedAnswers>,
}

/// Verified submissions of a survey. Requires the survey admin's session.
#[utoipa::path(
    get,
    path = "/surveys/{admin}/{survey}/results",
    params(
        ("admin" = String, Path, description = "The name of the admin"),
        ("survey" = String, Path, description = "The name of the survey")
    ),
    responses(
        (status = 200, description = "Verified submissions", body = SurveyResults),
        (status = 400, description = "Invalid token format", body = String),
        (status = 401, description = "Missing, expired or foreign token", body = String)
    ),
    security(("bearer" = [])),
    tag = "submissions"
)]
#[instrument(skip(state, headers))]
pub async fn results(
    Path((admin, survey)): Path<(String, String)>,
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
) -> impl IntoResponse {
    let Some(token) = extract_bearer_token(&headers) else {
        return (StatusCode::UNAUTHORIZED, "unauthorized".to_string()).into_response();
    };
    if let Err(err) = state.admins().authorize(&admin, &token) {
        return auth_error_response(&err).into_response();
    }

    let survey_id = survey_id(&admin, &survey);
    match state.lifecycle().verified(&survey_id).await {
        Ok(verified) => {
            let submissions: Vec<VerifiedAnswers> = verified
                .into_iter()
                .map(|submission| VerifiedAnswers {
                    id: submission.id,
                    answers: submission.answers,
                    created_at: submission.created_at,
                })
                .collect();
            Json(SurveyResults {
                survey_id,
                count: submissions.len(),
                submissions,
            })
            .into_response()
        }
        Err(err) => lifecycle_error_response(&err).into_response(),
    }
}
