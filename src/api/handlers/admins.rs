//! Admin registration, login and account lookup.

use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use super::extract_bearer_token;
use crate::admin::Credential;
use crate::api::error::{admin_error_response, auth_error_response};
use crate::api::state::AppState;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AdminResponse {
    pub username: String,
    pub created_at: i64,
}

impl From<Credential> for AdminResponse {
    fn from(credential: Credential) -> Self {
        Self {
            username: credential.username,
            created_at: credential.created_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/admins/{admin}",
    request_body = RegisterRequest,
    params(("admin" = String, Path, description = "The name of the admin")),
    responses(
        (status = 201, description = "Admin created", body = AdminResponse),
        (status = 400, description = "Invalid username or password", body = String),
        (status = 409, description = "Username already taken", body = String)
    ),
    tag = "admins"
)]
#[instrument(skip(state, payload))]
pub async fn register(
    Path(admin): Path<String>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match state.admins().register(&admin, &request.password).await {
        Ok(credential) => {
            (StatusCode::CREATED, Json(AdminResponse::from(credential))).into_response()
        }
        Err(err) => admin_error_response(&err).into_response(),
    }
}

/// Exchange username and password for a bearer token.
#[utoipa::path(
    post,
    path = "/authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token issued", body = LoginResponse),
        (status = 401, description = "Invalid username or password", body = String)
    ),
    tag = "admins"
)]
#[instrument(skip(state, payload))]
pub async fn login(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match state
        .admins()
        .login(&request.username, &request.password)
        .await
    {
        Ok(token) => Json(LoginResponse {
            access_token: token.value,
            token_type: "bearer".to_string(),
        })
        .into_response(),
        Err(err) => admin_error_response(&err).into_response(),
    }
}

/// Fetch an admin account. Only that admin's own session may read it.
#[utoipa::path(
    get,
    path = "/admins/{admin}",
    params(("admin" = String, Path, description = "The name of the admin")),
    responses(
        (status = 200, description = "Admin account", body = AdminResponse),
        (status = 400, description = "Invalid token format", body = String),
        (status = 401, description = "Missing, expired or foreign token", body = String),
        (status = 404, description = "Admin not found", body = String)
    ),
    security(("bearer" = [])),
    tag = "admins"
)]
#[instrument(skip(state, headers))]
pub async fn fetch(
    Path(admin): Path<String>,
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
) -> impl IntoResponse {
    let Some(token) = extract_bearer_token(&headers) else {
        return (StatusCode::UNAUTHORIZED, "unauthorized".to_string()).into_response();
    };
    if let Err(err) = state.admins().authorize(&admin, &token) {
        return auth_error_response(&err).into_response();
    }

    match state.admins().fetch(&admin).await {
        Ok(credential) => Json(AdminResponse::from(credential)).into_response(),
        Err(err) => admin_error_response(&err).into_response(),
    }
}
