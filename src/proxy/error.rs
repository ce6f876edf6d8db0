use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("No proxy route for {0}")]
    NoRoute(String),

    #[error("Could not read request: {0}")]
    InvalidRequest(String),

    /// The upstream could not be reached or its reply could not be read.
    #[error("{0}")]
    Upstream(String),
}

impl ProxyError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NoRoute(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) | Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body returned to clients: `{ error, message }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: match &self {
                Self::NoRoute(_) => "Not found",
                _ => "Proxy error",
            },
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
