//! Authentication Middleware
//! Mission: Require a bearer token on protected account routes

use crate::error::ServiceError;
use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

/// Raw token taken from the `Authorization` header. Handlers pass it to the
/// account service, which does the actual verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken(pub String);

/// The header value is the token itself. A `Bearer ` scheme is tolerated
/// for clients that send one.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Rejects requests without a token and stores the token in request extensions
pub async fn require_token(mut req: Request, next: Next) -> Result<Response, ServiceError> {
    let token = token_from_headers(req.headers()).ok_or(ServiceError::Unauthenticated)?;

    req.extensions_mut().insert(AuthToken(token));

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_raw_token_is_used_as_is() {
        let headers = headers_with("eyJhbGciOi.payload.sig");
        assert_eq!(
            token_from_headers(&headers).as_deref(),
            Some("eyJhbGciOi.payload.sig")
        );
    }

    #[test]
    fn test_bearer_prefix_is_stripped() {
        let headers = headers_with("Bearer eyJhbGciOi.payload.sig");
        assert_eq!(
            token_from_headers(&headers).as_deref(),
            Some("eyJhbGciOi.payload.sig")
        );
    }

    #[test]
    fn test_missing_or_empty_header() {
        assert!(token_from_headers(&HeaderMap::new()).is_none());
        assert!(token_from_headers(&headers_with("")).is_none());
        assert!(token_from_headers(&headers_with("Bearer ")).is_none());
    }
}
