//! Account handlers
//!
//! All routes are behind the bearer middleware; the owner always comes from
//! the verified token, never from the request.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
};
use validator::Validate;

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResponse, CreateAccountRequest, ListAccountsQuery, error_codes,
};
use super::{bad_input, parse_id};
use crate::account::validation::describe_errors;
use crate::account::{Account, CreateAccountParams, Currency, ListAccountsParams};
use crate::store::StoreError;
use crate::token::Payload;

/// Open an account
///
/// POST /accounts
#[utoipa::path(
    post,
    path = "/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<Account>),
        (status = 400, description = "Unsupported currency"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Account for this currency already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Extension(payload): Extension<Payload>,
    body: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Account>>), ApiError> {
    let Json(req) = body.map_err(bad_input)?;
    req.validate().map_err(|e| {
        ApiError::bad_request(error_codes::INVALID_PARAMETER, describe_errors(&e))
    })?;
    let currency: Currency = req
        .currency
        .parse()
        .map_err(|e| ApiError::bad_request(error_codes::INVALID_PARAMETER, format!("{e}")))?;

    let mut conn = state.store.connection().await?;
    let account = conn
        .create_account(CreateAccountParams {
            owner: payload.username.clone(),
            balance: 0,
            currency,
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) | StoreError::ForeignKeyViolation(_) => {
                tracing::warn!(owner = %payload.username, %currency, error = %e, "Account rejected");
                ApiError::forbidden(error_codes::ACCOUNT_EXISTS, e.to_string())
            }
            other => ApiError::internal(other),
        })?;

    tracing::info!(account_id = account.id, owner = %account.owner, %currency, "Account created");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(account))))
}

/// Get one of the caller's accounts
///
/// GET /accounts/{id}
#[utoipa::path(
    get,
    path = "/accounts/{id}",
    params(("id" = i64, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account", body = ApiResponse<Account>),
        (status = 400, description = "Invalid id"),
        (status = 401, description = "Account belongs to another user"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(payload): Extension<Payload>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<Account>>, ApiError> {
    let id = parse_id(&raw_id, "account")?;

    let mut conn = state.store.connection().await?;
    let account = conn.get_account(id).await.map_err(|e| match e {
        StoreError::NotFound => {
            ApiError::not_found(error_codes::ACCOUNT_NOT_FOUND, format!("Account {id} not found"))
        }
        other => ApiError::internal(other),
    })?;

    if account.owner != payload.username {
        return Err(ApiError::unauthorized(
            error_codes::NOT_OWNER,
            "Account doesn't belong to the authenticated user",
        ));
    }

    Ok(Json(ApiResponse::success(account)))
}

/// List the caller's accounts
///
/// GET /accounts?page_id=1&page_size=5
#[utoipa::path(
    get,
    path = "/accounts",
    params(ListAccountsQuery),
    responses(
        (status = 200, description = "Accounts page", body = ApiResponse<Vec<Account>>),
        (status = 400, description = "Invalid paging parameters"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(payload): Extension<Payload>,
    query: Result<Query<ListAccountsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Account>>>, ApiError> {
    let Query(query) = query.map_err(bad_input)?;
    query.validate().map_err(|e| {
        ApiError::bad_request(error_codes::INVALID_PARAMETER, describe_errors(&e))
    })?;

    let mut conn = state.store.connection().await?;
    let accounts = conn
        .list_accounts(ListAccountsParams {
            owner: payload.username,
            limit: query.page_size,
            offset: query.offset(),
        })
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(ApiResponse::success(accounts)))
}
