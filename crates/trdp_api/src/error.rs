//! Error types for the automation API.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use trdp_core::SimError;

/// Result type alias for handler operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors raised while loading server configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that stop the HTTP server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Clone, Debug)]
pub struct ErrorState {
    pub message: String,
    pub request_id: Option<String>,
}

impl ErrorState {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            request_id: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct ErrorEnvelope {
    request_id: String,
    error: ErrorBody,
}

/// HTTP-facing error, rendered as `{request_id, error: {code, message}}`.
///
/// An error rendered without a request id carries itself in the response
/// extensions so the request middleware can tag it with the id it logged.
#[derive(Clone, Debug)]
pub enum ApiError {
    BadRequest(ErrorState),
    NotFound(ErrorState),
    Conflict(ErrorState),
    Unprocessable(ErrorState),
    Internal(ErrorState),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(ErrorState::new(message))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(ErrorState::new(message))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(ErrorState::new(message))
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::Unprocessable(ErrorState::new(message))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(ErrorState::new(message))
    }

    fn state(&self) -> &ErrorState {
        match self {
            Self::BadRequest(s)
            | Self::NotFound(s)
            | Self::Conflict(s)
            | Self::Unprocessable(s)
            | Self::Internal(s) => s,
        }
    }

    fn state_mut(&mut self) -> &mut ErrorState {
        match self {
            Self::BadRequest(s)
            | Self::NotFound(s)
            | Self::Conflict(s)
            | Self::Unprocessable(s)
            | Self::Internal(s) => s,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.state_mut().request_id = Some(request_id.into());
        self
    }

    /// Map an error raised by a control operation on an existing run.
    ///
    /// Pause, resume, fail and fault injection report an unknown run as a bad
    /// request rather than a missing resource.
    pub fn from_control(err: SimError) -> Self {
        match err {
            SimError::Communication(e) => Self::internal(e.to_string()),
            other => Self::bad_request(other.to_string()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SimError> for ApiError {
    fn from(err: SimError) -> Self {
        match err {
            SimError::Conflict(msg) => Self::conflict(msg),
            SimError::UnknownRun(_) => Self::not_found(err.to_string()),
            SimError::InvalidState(msg) => Self::bad_request(msg),
            SimError::RunFailed(_) => Self::unprocessable(err.to_string()),
            SimError::Communication(e) => Self::internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let untagged = self.state().request_id.is_none().then(|| self.clone());
        let (code, state) = match self {
            Self::BadRequest(s) => ("invalid_argument", s),
            Self::NotFound(s) => ("not_found", s),
            Self::Conflict(s) => ("conflict", s),
            Self::Unprocessable(s) => ("unprocessable", s),
            Self::Internal(s) => ("internal", s),
        };
        let request_id = state
            .request_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let body = ErrorEnvelope {
            request_id,
            error: ErrorBody {
                code,
                message: state.message,
            },
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(err) = untagged {
            response.extensions_mut().insert(err);
        }
        response
    }
}
