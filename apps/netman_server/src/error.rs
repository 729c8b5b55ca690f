//! Maps the closed `NetmanError` taxonomy (and the two usage errors the
//! taxonomy has no slot for) onto HTTP responses, per §7.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use netman_engine::{ActionError, OpenError};
use netman_model::NetmanError;
use serde::Serialize;
use tracing::{error, warn};

pub enum ApiError {
    Netman(NetmanError),
    NoSessionForHost(String),
    DuplicateSessionId(String),
    UnknownAction(String),
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl From<NetmanError> for ApiError {
    fn from(err: NetmanError) -> Self {
        ApiError::Netman(err)
    }
}

impl From<OpenError> for ApiError {
    fn from(err: OpenError) -> Self {
        match err {
            OpenError::DuplicateSessionId(id) => ApiError::DuplicateSessionId(id),
            OpenError::Netman(err) => ApiError::Netman(err),
        }
    }
}

impl From<ActionError> for ApiError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::UnknownAction(action) => ApiError::UnknownAction(action),
            ActionError::Netman(err) => ApiError::Netman(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, taxonomy, message) = match self {
            ApiError::Netman(err) => {
                let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, err.taxonomy_name().to_string(), err.to_string())
            }
            ApiError::NoSessionForHost(host) => (
                StatusCode::NOT_FOUND,
                "NoSessionForHost".to_string(),
                format!("no open session for switch '{host}'"),
            ),
            ApiError::DuplicateSessionId(id) => (
                StatusCode::CONFLICT,
                "DuplicateSessionId".to_string(),
                format!("session '{id}' already exists"),
            ),
            ApiError::UnknownAction(action) => (
                StatusCode::BAD_REQUEST,
                "UnknownAction".to_string(),
                format!("unknown session action '{action}'"),
            ),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "BadRequest".to_string(), message),
        };

        if status.is_server_error() {
            error!(target: "netman_server::http", status = status.as_u16(), "{message}");
        } else if status.is_client_error() {
            warn!(target: "netman_server::http", status = status.as_u16(), "{message}");
        }

        (status, Json(ErrorBody { error: taxonomy, message })).into_response()
    }
}
