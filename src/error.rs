//! Service errors and their HTTP mapping.

use crate::auth::{account_store::StoreError, jwt::TokenError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Caller-fixable input problem.
    Validation(String),
    DuplicateEmail,
    /// No token was presented.
    Unauthenticated,
    InvalidCredentials,
    InvalidToken,
    ExpiredToken,
    NotAuthorized,
    NotFound(&'static str),
    /// Storage failure or anything else unexpected. The detail is logged,
    /// never returned to the client.
    Internal(String),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::Unauthenticated
            | Self::InvalidCredentials
            | Self::InvalidToken
            | Self::ExpiredToken => StatusCode::UNAUTHORIZED,
            Self::NotAuthorized => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "{}", msg),
            Self::DuplicateEmail => write!(f, "User with this email already exists"),
            Self::Unauthenticated => write!(f, "Missing authorization token"),
            Self::InvalidCredentials => write!(f, "Invalid credentials"),
            Self::InvalidToken => write!(f, "Invalid token"),
            Self::ExpiredToken => write!(f, "Token expired"),
            Self::NotAuthorized => write!(f, "Operation not allowed"),
            Self::NotFound(what) => write!(f, "{} not found", what),
            Self::Internal(detail) => write!(f, "Internal error: {}", detail),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => Self::DuplicateEmail,
            StoreError::NotFound => Self::NotFound("User"),
            StoreError::Validation(msg) => Self::Validation(msg),
            StoreError::Backend(msg) => Self::Internal(msg),
        }
    }
}

impl From<TokenError> for ServiceError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => Self::InvalidToken,
            TokenError::Expired => Self::ExpiredToken,
            TokenError::Encoding(msg) => Self::Internal(msg),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(detail) => {
                error!("Request failed: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ServiceError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (ServiceError::DuplicateEmail, StatusCode::CONFLICT),
            (ServiceError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ServiceError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ServiceError::InvalidToken, StatusCode::UNAUTHORIZED),
            (ServiceError::ExpiredToken, StatusCode::UNAUTHORIZED),
            (ServiceError::NotAuthorized, StatusCode::FORBIDDEN),
            (ServiceError::NotFound("User"), StatusCode::NOT_FOUND),
            (
                ServiceError::Internal("disk full".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_store_errors_convert() {
        assert_eq!(
            ServiceError::from(StoreError::DuplicateEmail),
            ServiceError::DuplicateEmail
        );
        assert_eq!(
            ServiceError::from(StoreError::NotFound),
            ServiceError::NotFound("User")
        );
        assert!(matches!(
            ServiceError::from(StoreError::Backend("locked".into())),
            ServiceError::Internal(_)
        ));
        assert_eq!(
            ServiceError::from(TokenError::Expired),
            ServiceError::ExpiredToken
        );
    }

    #[tokio::test]
    async fn test_internal_detail_is_redacted() {
        let response = ServiceError::Internal("sqlite: database is locked".into()).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();

        assert_eq!(body, "Internal server error");
    }
}
