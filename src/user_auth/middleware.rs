use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::service::UserAuthError;
use crate::gateway::{
    state::AppState,
    types::{ApiError, error_codes},
};
use crate::token::TokenError;

const BEARER: &str = "bearer";

/// Require `Authorization: Bearer <token>` and inject the verified
/// [`Payload`](crate::token::Payload) into request extensions.
pub async fn bearer_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract Authorization header
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            ApiError::unauthorized(error_codes::MISSING_AUTH, "Missing Authorization header")
        })?;

    // 2. Split "<type> <token>"
    let mut parts = auth_header.split_whitespace();
    let (auth_type, token) = match (parts.next(), parts.next(), parts.next()) {
        (Some(auth_type), Some(token), None) => (auth_type, token),
        _ => {
            return Err(ApiError::unauthorized(
                error_codes::AUTH_FAILED,
                "Invalid authorization header format",
            ));
        }
    };

    if !auth_type.eq_ignore_ascii_case(BEARER) {
        return Err(ApiError::unauthorized(
            error_codes::AUTH_FAILED,
            format!("Unsupported authorization type {auth_type}"),
        ));
    }

    // 3. Verify token
    let payload = state.user_auth.verify_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Token rejected");
        match e {
            UserAuthError::Unauthorized(TokenError::ExpiredToken) => {
                ApiError::unauthorized(error_codes::TOKEN_EXPIRED, "Token has expired")
            }
            _ => ApiError::unauthorized(error_codes::AUTH_FAILED, "Invalid token"),
        }
    })?;

    // 4. Inject payload
    request.extensions_mut().insert(payload);
    Ok(next.run(request).await)
}
