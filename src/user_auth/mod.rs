//! User registration, login and bearer-token authentication

pub mod handlers;
pub mod middleware;
pub mod password;
pub mod service;

pub use middleware::bearer_auth_middleware;
pub use password::{PasswordError, check_password, hash_password};
pub use service::{
    CreateUserRequest, LoginUserRequest, LoginUserResponse, UserAuthError, UserAuthService,
    UserResponse,
};
