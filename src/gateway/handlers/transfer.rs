//! Transfer handlers
//!
//! The handler owns every check the engine leaves to its caller:
//! both accounts exist, both hold the requested currency, and the caller owns
//! the source account. Only then is the engine invoked.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
};
use validator::Validate;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResponse, CreateTransferRequest, error_codes};
use super::{bad_input, parse_id};
use crate::account::validation::describe_errors;
use crate::account::{Account, Currency, Transfer};
use crate::core_types::AccountId;
use crate::store::{LedgerQueries, StoreError};
use crate::token::Payload;
use crate::transfer::{TransferParams, TransferResult};

/// Load an account and check its currency
async fn valid_account(
    conn: &mut dyn LedgerQueries,
    id: AccountId,
    currency: Currency,
) -> Result<Account, ApiError> {
    let account = conn.get_account(id).await.map_err(|e| match e {
        StoreError::NotFound => {
            ApiError::not_found(error_codes::ACCOUNT_NOT_FOUND, format!("Account {id} not found"))
        }
        other => ApiError::internal(other),
    })?;

    if account.currency != currency {
        return Err(ApiError::bad_request(
            error_codes::CURRENCY_MISMATCH,
            format!(
                "Account {} currency mismatch: {} vs {}",
                id, account.currency, currency
            ),
        ));
    }
    Ok(account)
}

/// Transfer money
///
/// POST /transfers
#[utoipa::path(
    post,
    path = "/transfers",
    request_body = CreateTransferRequest,
    responses(
        (status = 200, description = "Transfer committed", body = ApiResponse<TransferResult>),
        (status = 400, description = "Invalid amount, same account or currency mismatch"),
        (status = 401, description = "Source account belongs to another user"),
        (status = 404, description = "Account not found"),
        (status = 500, description = "Transfer rolled back"),
        (status = 504, description = "Transfer timed out and rolled back")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfers"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Extension(payload): Extension<Payload>,
    body: Result<Json<CreateTransferRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TransferResult>>, ApiError> {
    // 1. Field validation
    let Json(req) = body.map_err(bad_input)?;
    req.validate().map_err(|e| {
        ApiError::bad_request(error_codes::INVALID_PARAMETER, describe_errors(&e))
    })?;
    if req.from_account_id == req.to_account_id {
        return Err(ApiError::bad_request(
            error_codes::SAME_ACCOUNT,
            "Cannot transfer to the same account",
        ));
    }
    let currency: Currency = req
        .currency
        .parse()
        .map_err(|e| ApiError::bad_request(error_codes::INVALID_PARAMETER, format!("{e}")))?;

    // 2. Accounts exist, currencies match, caller owns the source
    {
        let mut conn = state.store.connection().await?;
        let from = valid_account(conn.as_mut(), req.from_account_id, currency).await?;
        if from.owner != payload.username {
            tracing::warn!(
                account_id = from.id,
                username = %payload.username,
                "Transfer from foreign account rejected"
            );
            return Err(ApiError::unauthorized(
                error_codes::NOT_OWNER,
                "From account doesn't belong to the authenticated user",
            ));
        }
        valid_account(conn.as_mut(), req.to_account_id, currency).await?;
    }

    // 3. Engine
    let result = state
        .engine
        .transfer(TransferParams {
            from_account_id: req.from_account_id,
            to_account_id: req.to_account_id,
            amount: req.amount,
        })
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

/// Get a transfer the caller took part in
///
/// GET /transfers/{id}
#[utoipa::path(
    get,
    path = "/transfers/{id}",
    params(("id" = i64, Path, description = "Transfer ID")),
    responses(
        (status = 200, description = "Transfer", body = ApiResponse<Transfer>),
        (status = 400, description = "Invalid id"),
        (status = 401, description = "Caller owns neither side"),
        (status = 404, description = "Transfer not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfers"
)]
pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Extension(payload): Extension<Payload>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<Transfer>>, ApiError> {
    let id = parse_id(&raw_id, "transfer")?;

    let mut conn = state.store.connection().await?;
    let transfer = conn.get_transfer(id).await.map_err(|e| match e {
        StoreError::NotFound => ApiError::not_found(
            error_codes::TRANSFER_NOT_FOUND,
            format!("Transfer {id} not found"),
        ),
        other => ApiError::internal(other),
    })?;

    let mut owns_side = false;
    for account_id in [transfer.from_account_id, transfer.to_account_id] {
        match conn.get_account(account_id).await {
            Ok(account) if account.owner == payload.username => {
                owns_side = true;
                break;
            }
            Ok(_) | Err(StoreError::NotFound) => {}
            Err(e) => return Err(ApiError::internal(e)),
        }
    }
    if !owns_side {
        return Err(ApiError::unauthorized(
            error_codes::NOT_OWNER,
            "Transfer doesn't involve the authenticated user",
        ));
    }

    Ok(Json(ApiResponse::success(transfer)))
}
