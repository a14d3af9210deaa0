pub mod admin;
pub mod auth;
pub mod characters;
pub mod conversations;
pub mod messages;
pub mod preferences;

pub use admin::*;
pub use auth::*;
pub use characters::*;
pub use conversations::*;
pub use messages::*;
pub use preferences::*;

use crate::admin::AdminError;
use crate::engine::EngineError;
use crate::session::AuthError;
use crate::store::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Admin(#[from] AdminError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

fn auth_status(e: &AuthError) -> StatusCode {
    match e {
        AuthError::MissingCredentials | AuthError::InvalidAmount => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials | AuthError::NotLoggedIn => StatusCode::UNAUTHORIZED,
        AuthError::NotAdmin => StatusCode::FORBIDDEN,
        AuthError::EmailTaken => StatusCode::CONFLICT,
        AuthError::UserNotFound(_) => StatusCode::NOT_FOUND,
        AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn engine_status(e: &EngineError) -> StatusCode {
    match e {
        EngineError::NotFound(_) | EngineError::CharacterNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::EmptySystemPrompt | EngineError::EmptyMessage => StatusCode::BAD_REQUEST,
        EngineError::TurnInFlight => StatusCode::CONFLICT,
        EngineError::Auth(e) => auth_status(e),
        EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn admin_status(e: &AdminError) -> StatusCode {
    match e {
        AdminError::Forbidden => StatusCode::FORBIDDEN,
        AdminError::InvalidCharacter(_) => StatusCode::BAD_REQUEST,
        AdminError::CharacterNotFound(_) => StatusCode::NOT_FOUND,
        AdminError::Auth(e) => auth_status(e),
        AdminError::Engine(e) => engine_status(e),
        AdminError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(e) => auth_status(e),
            ApiError::Engine(e) => engine_status(e),
            ApiError::Admin(e) => admin_status(e),
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {:?}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_nested_errors_keep_their_status() {
        let in_flight: ApiError = EngineError::TurnInFlight.into();
        assert_eq!(in_flight.status(), StatusCode::CONFLICT);

        let not_logged_in: ApiError = EngineError::Auth(AuthError::NotLoggedIn).into();
        assert_eq!(not_logged_in.status(), StatusCode::UNAUTHORIZED);

        let missing: ApiError = AdminError::Engine(EngineError::NotFound(Uuid::nil())).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let forbidden: ApiError = AdminError::Forbidden.into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }
}
