//! HTTP surface for the push endpoint
//!
//! ## Endpoints
//! - `GET <path>` - open a push channel (SSE, or WebSocket on upgrade)
//! - `POST <path>` - send a message to be echoed to the relay group
//! - `DELETE <path>?uuid=<id>` - close a channel on the client's behalf
//! - `GET /health` - liveness
//! - `GET /stats` - groups and connection counts

pub mod http;
pub mod resource;
pub mod state;
pub mod websocket;

use axum::{
    extract::rejection::StringRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::types::PushError;

pub use http::create_router;
pub use state::AppState;

/// Header carrying the connection id in both directions
pub const UUID_HEADER: &str = "x-push-uuid";

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: "BAD_REQUEST".to_string(),
        }
    }

    /// Response for a body axum refused to read (over the size cap, bad UTF-8)
    pub fn from_rejection(rejection: StringRejection) -> Response {
        let status = rejection.status();
        let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "PAYLOAD_TOO_LARGE"
        } else {
            "BAD_REQUEST"
        };
        let body = Self {
            error: rejection.body_text(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for PushError {
    fn into_response(self) -> Response {
        let status = match &self {
            PushError::UnknownConnection(_) => StatusCode::NOT_FOUND,
            PushError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            PushError::ConnectionClosed(_) => StatusCode::GONE,
            PushError::QueueFull(_) | PushError::RegistryShutdown => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PushError::Config { .. } | PushError::Io(_) | PushError::Signal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ApiError {
            error: self.to_string(),
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
