use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;
use validator::Validate;

use super::password::{PasswordError, check_password, hash_password};
use crate::account::validation::{describe_errors, username_rule};
use crate::account::{CreateUserParams, User};
use crate::store::{Store, StoreError};
use crate::token::{Payload, TokenError, TokenMaker};

#[derive(Error, Debug)]
pub enum UserAuthError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("username or email already exists")]
    UserExists,

    #[error("user not found")]
    UserNotFound,

    #[error("incorrect password")]
    WrongPassword,

    #[error("unauthorized: {0}")]
    Unauthorized(#[source] TokenError),

    #[error("failed to issue token: {0}")]
    TokenIssue(#[source] TokenError),

    #[error("password hashing failed: {0}")]
    Password(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// User Registration Request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(custom(function = "username_rule"))]
    #[schema(example = "alice")]
    pub username: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    #[schema(example = "secret123")]
    pub password: String,
    #[validate(length(min = 1, message = "full_name is required"))]
    #[schema(example = "Alice Liddell")]
    pub full_name: String,
    #[validate(email(message = "email is invalid"))]
    #[schema(example = "alice@example.com")]
    pub email: String,
}

/// User Login Request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginUserRequest {
    #[validate(custom(function = "username_rule"))]
    #[schema(example = "alice")]
    pub username: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    #[schema(example = "secret123")]
    pub password: String,
}

/// Public view of a user (no password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            password_changed_at: user.password_changed_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginUserResponse {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

pub struct UserAuthService {
    store: Arc<dyn Store>,
    token_maker: Arc<dyn TokenMaker>,
    access_token_duration: Duration,
}

impl UserAuthService {
    pub fn new(
        store: Arc<dyn Store>,
        token_maker: Arc<dyn TokenMaker>,
        access_token_duration: Duration,
    ) -> Self {
        Self {
            store,
            token_maker,
            access_token_duration,
        }
    }

    /// Register a new user
    pub async fn register(&self, req: CreateUserRequest) -> Result<UserResponse, UserAuthError> {
        req.validate()
            .map_err(|e| UserAuthError::Validation(describe_errors(&e)))?;

        let hashed_password = hash_password(&req.password).map_err(|e| match e {
            PasswordError::Hash(msg) => UserAuthError::Password(msg),
            PasswordError::Mismatch => UserAuthError::Password(e.to_string()),
        })?;

        let mut conn = self.store.connection().await?;
        let user = conn
            .create_user(CreateUserParams {
                username: req.username,
                hashed_password,
                full_name: req.full_name,
                email: req.email,
            })
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => UserAuthError::UserExists,
                other => UserAuthError::Store(other),
            })?;

        tracing::info!(username = %user.username, "User registered");
        Ok(user.into())
    }

    /// Login user and issue an access token
    pub async fn login(&self, req: LoginUserRequest) -> Result<LoginUserResponse, UserAuthError> {
        req.validate()
            .map_err(|e| UserAuthError::Validation(describe_errors(&e)))?;

        let mut conn = self.store.connection().await?;
        let user = conn.get_user(&req.username).await.map_err(|e| match e {
            StoreError::NotFound => UserAuthError::UserNotFound,
            other => UserAuthError::Store(other),
        })?;

        check_password(&req.password, &user.hashed_password).map_err(|e| match e {
            PasswordError::Mismatch => UserAuthError::WrongPassword,
            PasswordError::Hash(msg) => UserAuthError::Password(msg),
        })?;

        let (access_token, payload) = self
            .token_maker
            .create_token(&user.username, self.access_token_duration)
            .map_err(UserAuthError::TokenIssue)?;

        tracing::info!(username = %user.username, token_id = %payload.id, "User logged in");
        Ok(LoginUserResponse {
            access_token,
            access_token_expires_at: payload.expired_at,
            user: user.into(),
        })
    }

    /// Verify a bearer token
    pub fn verify_token(&self, token: &str) -> Result<Payload, UserAuthError> {
        self.token_maker
            .verify_token(token)
            .map_err(UserAuthError::Unauthorized)
    }
}
