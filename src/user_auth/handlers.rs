use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use std::sync::Arc;

use super::service::{CreateUserRequest, LoginUserRequest, LoginUserResponse, UserResponse};
use crate::gateway::types::{ApiError, ApiResponse, error_codes};
use crate::gateway::state::AppState;

/// Register a new user
///
/// POST /users
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Username or email already exists"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let Json(req) = body.map_err(|e| {
        ApiError::bad_request(error_codes::INVALID_PARAMETER, e.to_string())
    })?;

    let user = state.user_auth.register(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// Login user
///
/// POST /users/login
#[utoipa::path(
    post,
    path = "/users/login",
    request_body = LoginUserRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginUserResponse>),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Incorrect password"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users"
)]
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginUserRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginUserResponse>>, ApiError> {
    let Json(req) = body.map_err(|e| {
        ApiError::bad_request(error_codes::INVALID_PARAMETER, e.to_string())
    })?;

    let resp = state.user_auth.login(req).await.inspect_err(|e| {
        tracing::warn!(error = %e, "Login failed");
    })?;
    Ok(Json(ApiResponse::success(resp)))
}
