use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub const INVALID_TARGET_MESSAGE: &str = "Invalid or missing externalApiUrl";
pub const RELAY_FAILURE_MESSAGE: &str = "An error occurred while processing the request";

/// Rejection of the `externalApiUrl` query parameter. Raised before any
/// network activity.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TargetError {
    #[error("externalApiUrl is missing")]
    Missing,

    #[error("externalApiUrl is empty")]
    Empty,

    #[error("externalApiUrl is not an absolute URI: {0}")]
    Malformed(String),
}

/// Failure while talking to the upstream. Every variant is terminal for the
/// invocation and surfaces as the same opaque 500.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("failed to build upstream client: {0}")]
    Client(reqwest::Error),

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

fn plain_text(status: StatusCode, body: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
}

impl IntoResponse for TargetError {
    fn into_response(self) -> Response {
        plain_text(StatusCode::BAD_REQUEST, INVALID_TARGET_MESSAGE)
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        plain_text(StatusCode::INTERNAL_SERVER_ERROR, RELAY_FAILURE_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_errors_share_one_response() {
        for err in [
            TargetError::Missing,
            TargetError::Empty,
            TargetError::Malformed("not-a-url".to_string()),
        ] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                response.headers().get(header::CONTENT_TYPE).unwrap(),
                "text/plain"
            );
        }
    }
}
