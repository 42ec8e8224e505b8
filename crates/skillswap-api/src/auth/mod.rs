//! Authentication and session lifecycle
//!
//! Component layout:
//! - Password hashing with Argon2id (`password`)
//! - Access/refresh token signing and verification (`token`)
//! - Authoritative refresh token records (`store`)
//! - Revoked access tokens (`registry`)
//! - Session flows: register, login, refresh, logout, password change
//!   (`service`)
//! - Request-time gates (`middleware`)

pub mod middleware;
pub mod password;
pub mod registry;
pub mod service;
pub mod store;
pub mod token;

pub use middleware::{auth_middleware, require_role, AuthenticatedUser};
pub use password::{hash_password, verify_password, PasswordConfig, PasswordError};
pub use registry::RevocationRegistry;
pub use service::{
    AuthResponse, AuthService, ChangePasswordRequest, LoginRequest, LogoutRequest, RefreshRequest,
    RefreshResponse, RegisterRequest, TokenPair, UserInfo,
};
pub use store::{RefreshRecord, RefreshTokenStore};
pub use token::{Claims, TokenCodec, TokenError, TokenKind};
