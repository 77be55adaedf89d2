use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Failures that reject a whole webhook request before any event runs.
#[derive(Debug, thiserror::Error)]
pub enum IngressError {
    #[error("channel credentials are not configured")]
    NotConfigured,

    #[error("missing or invalid signature")]
    Unauthorized,

    #[error("malformed webhook payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

impl IngressError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MalformedPayload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            // Parser details stay in the logs.
            Self::MalformedPayload(_) => "malformed payload".to_string(),
            other => other.to_string(),
        };
        (status, body).into_response()
    }
}
