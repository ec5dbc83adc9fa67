use axum::{
    Json,
    body::Body,
    http::StatusCode,
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Failures talking to Azure AD. These never reach the host verbatim; the
/// decision layer logs them and answers with a generic rejection.
#[derive(Debug, thiserror::Error)]
pub enum AzureError {
    #[error("failed requesting Azure AD access token: {0}")]
    Authentication(String),
    #[error("Azure AD request to {endpoint} failed: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },
    #[error("Azure AD returned an unreadable payload from {endpoint}: {message}")]
    Payload {
        endpoint: &'static str,
        message: String,
    },
}

impl AzureError {
    pub fn transport(endpoint: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            endpoint,
            message: err.to_string(),
        }
    }

    pub fn payload(endpoint: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Payload {
            endpoint,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error("internal server error")]
    Internal,
}

impl RegistryError {
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::http(StatusCode::UNAUTHORIZED, message)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            RegistryError::Http { status, message } => (*status, message.as_str()),
            RegistryError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "unknown error"),
        };
        let body = serde_json::to_vec(&ErrorBody { error: message })
            .unwrap_or_else(|_| b"{\"error\":\"unknown error\"}".to_vec());
        Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, crate::constants::HEADER_JSON)
            .body(Body::from(body))
            .unwrap_or_else(|_| {
                let fallback = Json(ErrorBody {
                    error: "unknown error",
                });
                (StatusCode::INTERNAL_SERVER_ERROR, fallback).into_response()
            })
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(_: std::io::Error) -> Self {
        RegistryError::Internal
    }
}
