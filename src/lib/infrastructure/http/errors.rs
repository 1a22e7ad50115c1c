//! API error-handling module

use std::fmt;

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::domain::mail::{AttachmentError, MailerError, MessageError};

/// Message returned for any multipart body that cannot be parsed
pub const INVALID_MULTIPART: &str = "Invalid multipart form";

/// An error raised in the API, rendered as a plain-text response
#[derive(Debug)]
pub struct ApiError {
    /// The status code
    pub status: StatusCode,

    /// The error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }

    /// Create a new bad request error
    pub fn new_400(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Create new internal server error
    pub fn new_500(message: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::new_500(&err.to_string())
    }
}

impl From<MessageError> for ApiError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::NoRecipients => ApiError::new_400("Please provide at least one recipient"),
        }
    }
}

impl From<AttachmentError> for ApiError {
    fn from(err: AttachmentError) -> Self {
        ApiError::new_500(&err.to_string())
    }
}

impl From<MailerError> for ApiError {
    fn from(err: MailerError) -> Self {
        match err {
            MailerError::InvalidAddress(_) => ApiError::new_400(&err.to_string()),
            MailerError::InvalidSender(_)
            | MailerError::Attachment { .. }
            | MailerError::SendError(_) => ApiError::new_500(&err.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        debug!("multipart error: {}", err.body_text());

        match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::new(err.status(), &err.body_text()),
            _ => ApiError::new_400(INVALID_MULTIPART),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        debug!("multipart rejection: {}", rejection.body_text());

        ApiError::new_400(INVALID_MULTIPART)
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::new(rejection.status(), &rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};
    use testresult::TestResult;

    use super::*;

    #[tokio::test]
    async fn test_error_response_is_plain_text() -> TestResult {
        let error = ApiError::new_400("Invalid multipart form");

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(body, "Invalid multipart form");

        Ok(())
    }

    #[test]
    fn test_api_error_from_error() {
        let api_error = ApiError::from(anyhow!("Internal server error"));

        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_error.message, "Internal server error");
    }

    #[test]
    fn test_api_error_from_mailer_error() {
        let invalid = ApiError::from(MailerError::InvalidAddress("nope".to_string()));
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        assert_eq!(invalid.message, "invalid email address \"nope\"");

        let failed = ApiError::from(MailerError::SendError(anyhow!("connection refused")));
        assert_eq!(failed.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.message, "failed to send email: connection refused");
    }

    #[test]
    fn test_api_error_from_invalid_sender_is_server_error() {
        let error = ApiError::from(MailerError::InvalidSender("not a sender".to_string()));

        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message, "invalid sender address \"not a sender\"");
    }

    #[test]
    fn test_api_error_from_attachment_error() {
        let error = ApiError::from(AttachmentError::Io {
            filename: "a.txt".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        });

        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message, "failed to store attachment \"a.txt\": disk full");
    }
}
