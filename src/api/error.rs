//! Status codes and plain-text bodies for domain errors.

use axum::http::StatusCode;
use tracing::{debug, error};

use crate::admin::AdminError;
use crate::auth::{AuthError, TokenError};
use crate::submission::LifecycleError;

pub(crate) fn token_error_response(err: &TokenError) -> (StatusCode, String) {
    let status = match err {
        TokenError::Expired { .. } | TokenError::BadSignature => StatusCode::UNAUTHORIZED,
        TokenError::Malformed => StatusCode::BAD_REQUEST,
    };
    (status, err.to_string())
}

pub(crate) fn auth_error_response(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::Unauthorized { cause: Some(cause) } => {
            debug!("rejected bearer token: {cause}");
            token_error_response(cause)
        }
        AuthError::Unauthorized { cause: None } => (StatusCode::UNAUTHORIZED, err.to_string()),
    }
}

pub(crate) fn lifecycle_error_response(err: &LifecycleError) -> (StatusCode, String) {
    let status = match err {
        LifecycleError::InvalidEmail | LifecycleError::InvalidSubmission(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LifecycleError::VerificationExpired => StatusCode::GONE,
        LifecycleError::InvalidVerificationToken => StatusCode::BAD_REQUEST,
        LifecycleError::UnknownOrAlreadyProcessedSubmission => StatusCode::NOT_FOUND,
        LifecycleError::Store(cause) => {
            error!("submission store failure: {cause:#}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            );
        }
    };
    (status, err.to_string())
}

pub(crate) fn admin_error_response(err: &AdminError) -> (StatusCode, String) {
    let status = match err {
        AdminError::InvalidUsername | AdminError::InvalidPassword => StatusCode::BAD_REQUEST,
        AdminError::Conflict => StatusCode::CONFLICT,
        AdminError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AdminError::NotFound => StatusCode::NOT_FOUND,
        AdminError::Store(cause) => {
            error!("admin store failure: {cause:#}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            );
        }
    };
    (status, err.to_string())
}
