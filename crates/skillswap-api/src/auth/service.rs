//! Session lifecycle service
//!
//! Business logic for registration, login, token refresh, logout, and
//! password changes. Composes the credential hasher, token codec, refresh
//! token store, and revocation registry around the external user directory.
//!
//! Session state machine per (user, refresh record): a record is created at
//! login/registration, stays active until logout or password change marks it
//! inactive or its TTL passes, and is physically purged by the periodic
//! sweep. The refresh flow reissues the access token only; the refresh
//! record is deliberately not rotated and remains valid until its own expiry
//! or an explicit logout.

use crate::audit::{audit_log, AuditContext, AuditEvent};
use crate::auth::middleware::AuthenticatedUser;
use crate::auth::password::{
    hash_password_with_config, validate_password_strength, verify_password, PasswordConfig,
};
use crate::auth::registry::RevocationRegistry;
use crate::auth::store::RefreshTokenStore;
use crate::auth::token::{TokenCodec, TokenError, TokenKind};
use crate::error::AuthError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use skillswap_core::{config::AuthConfig, DirectoryError, User, UserDirectory, UserRole};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Logout request; the refresh token is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// Password change request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Issued credentials
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_in: u64,
}

/// Public user representation, safe for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.to_string(),
            verified: user.verified,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

/// Authentication response with user and tokens
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub user: UserInfo,
    pub tokens: TokenPair,
}

/// Refresh response; carries a new access token only
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub tokens: TokenPair,
}

// Verified against when the email is unknown, so both login failure paths
// cost a comparable amount of work
const UNKNOWN_USER_HASH: &str =
    "$argon2id$v=19$m=65536,t=3,p=4$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Session lifecycle service
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    codec: Arc<TokenCodec>,
    store: Arc<RefreshTokenStore>,
    registry: Arc<RevocationRegistry>,
    password: PasswordConfig,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        codec: Arc<TokenCodec>,
        store: Arc<RefreshTokenStore>,
        registry: Arc<RevocationRegistry>,
        auth_config: &AuthConfig,
    ) -> Self {
        Self {
            directory,
            codec,
            store,
            registry,
            password: PasswordConfig::from(auth_config),
            refresh_ttl: Duration::seconds(auth_config.refresh_ttl_secs as i64),
        }
    }

    /// Register a new account and open its first session
    pub async fn register(
        &self,
        request: RegisterRequest,
        ctx: &AuditContext,
    ) -> Result<AuthResponse, AuthError> {
        if request.email.is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        if !request.email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if request.password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        if request.name.is_empty() {
            return Err(AuthError::MissingField("name"));
        }
        validate_password_strength(&request.password).map_err(AuthError::WeakPassword)?;

        let email = request.email.clone();
        let password_hash = self.hash(request.password.clone()).await?;
        let user = User::new(request.email, password_hash, request.name, UserRole::Student);

        let user = match self.directory.create(user).await {
            Ok(user) => user,
            Err(DirectoryError::EmailAlreadyExists) => {
                audit_log(
                    ctx,
                    &AuditEvent::RegistrationFailure {
                        email,
                        reason: "email already registered".to_string(),
                    },
                );
                return Err(AuthError::UserExists);
            }
            Err(e) => return Err(AuthError::Internal(e.to_string())),
        };

        let tokens = self.issue_tokens(&user)?;
        audit_log(
            ctx,
            &AuditEvent::RegistrationSuccess {
                user_id: user.id,
                email: user.email.clone(),
                role: user.role,
            },
        );

        Ok(AuthResponse {
            success: true,
            user: UserInfo::from(&user),
            tokens,
        })
    }

    /// Login with email and password
    pub async fn login(
        &self,
        request: LoginRequest,
        ctx: &AuditContext,
    ) -> Result<AuthResponse, AuthError> {
        if request.email.is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        if request.password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }

        // Unknown email and wrong password both collapse into the same
        // InvalidCredentials response; only the audit log knows which
        let user = match self.directory.find_by_email(&request.email).await {
            Ok(user) => user,
            Err(DirectoryError::UserNotFound) => {
                // Burn the same hashing work as the wrong-password path
                let _ = self
                    .verify(request.password.clone(), UNKNOWN_USER_HASH.to_string())
                    .await;
                audit_log(
                    ctx,
                    &AuditEvent::LoginFailure {
                        email: request.email,
                        reason: "unknown email".to_string(),
                    },
                );
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(AuthError::Internal(e.to_string())),
        };

        if !self
            .verify(request.password.clone(), user.password_hash.clone())
            .await?
        {
            audit_log(
                ctx,
                &AuditEvent::LoginFailure {
                    email: user.email,
                    reason: "wrong password".to_string(),
                },
            );
            return Err(AuthError::InvalidCredentials);
        }

        if let Err(e) = self
            .directory
            .update(user.id, skillswap_core::UserUpdate::last_login(Utc::now()))
            .await
        {
            tracing::warn!(user_id = %user.id, error = %e, "failed to stamp last login");
        }

        let tokens = self.issue_tokens(&user)?;
        audit_log(
            ctx,
            &AuditEvent::LoginSuccess {
                user_id: user.id,
                email: user.email.clone(),
            },
        );

        Ok(AuthResponse {
            success: true,
            user: UserInfo::from(&user),
            tokens,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh record must exist, be active, match the presented string
    /// exactly, and be inside its TTL. The record itself is not rotated.
    pub async fn refresh(
        &self,
        request: RefreshRequest,
        ctx: &AuditContext,
    ) -> Result<RefreshResponse, AuthError> {
        let token = match request.refresh_token.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AuthError::RefreshTokenRequired),
        };

        let claims = self
            .codec
            .verify(token, TokenKind::Refresh)
            .map_err(|e| match e {
                TokenError::Expired => AuthError::RefreshTokenExpired,
                _ => AuthError::RefreshTokenInvalid,
            })?;

        let record = self
            .store
            .get(claims.jti)
            .ok_or(AuthError::RefreshTokenInvalid)?;

        if !record.is_active || record.token != token {
            return Err(AuthError::RefreshTokenInvalid);
        }
        if record.is_expired(Utc::now()) {
            return Err(AuthError::RefreshTokenExpired);
        }

        let user = self
            .directory
            .find_by_id(record.user_id)
            .await
            .map_err(|_| AuthError::RefreshTokenInvalid)?;

        let access_token = self
            .codec
            .mint_access(&user)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        audit_log(ctx, &AuditEvent::TokenRefresh { user_id: user.id });

        Ok(RefreshResponse {
            success: true,
            tokens: TokenPair {
                access_token,
                refresh_token: None,
                token_type: "Bearer".to_string(),
                expires_in: self.codec.access_ttl_secs(),
            },
        })
    }

    /// End the current session.
    ///
    /// The access token is revoked unconditionally. A refresh token in the
    /// request is deactivated when it verifies and belongs to the caller;
    /// an invalid one is ignored rather than failing the logout.
    pub async fn logout(
        &self,
        user: &AuthenticatedUser,
        request: LogoutRequest,
        ctx: &AuditContext,
    ) -> Result<(), AuthError> {
        self.registry.revoke(&user.token);

        if let Some(refresh_token) = request.refresh_token.as_deref() {
            match self.codec.verify(refresh_token, TokenKind::Refresh) {
                Ok(claims) if claims.sub == user.id => self.store.deactivate(claims.jti),
                Ok(_) => {
                    tracing::debug!(user_id = %user.id, "logout refresh token owned by another user, ignored");
                }
                Err(e) => {
                    tracing::debug!(user_id = %user.id, error = %e, "logout refresh token invalid, ignored");
                }
            }
        }

        audit_log(
            ctx,
            &AuditEvent::Logout {
                user_id: user.id,
                email: user.email.clone(),
                everywhere: false,
            },
        );

        Ok(())
    }

    /// End every session the caller owns
    pub async fn logout_all(
        &self,
        user: &AuthenticatedUser,
        ctx: &AuditContext,
    ) -> Result<(), AuthError> {
        self.registry.revoke(&user.token);
        let ended = self.store.deactivate_all_for_user(user.id);
        tracing::debug!(user_id = %user.id, ended, "logout everywhere");

        audit_log(
            ctx,
            &AuditEvent::Logout {
                user_id: user.id,
                email: user.email.clone(),
                everywhere: true,
            },
        );

        Ok(())
    }

    /// Change the caller's password.
    ///
    /// A successful change invalidates every outstanding session: the current
    /// access token is revoked and all refresh records are deactivated.
    pub async fn change_password(
        &self,
        user: &AuthenticatedUser,
        request: ChangePasswordRequest,
        ctx: &AuditContext,
    ) -> Result<(), AuthError> {
        if request.current_password.is_empty() {
            return Err(AuthError::MissingField("currentPassword"));
        }
        if request.new_password.is_empty() {
            return Err(AuthError::MissingField("newPassword"));
        }
        validate_password_strength(&request.new_password).map_err(AuthError::WeakPassword)?;

        let account = match self.directory.find_by_id(user.id).await {
            Ok(account) => account,
            Err(DirectoryError::UserNotFound) => return Err(AuthError::UserNotFound),
            Err(e) => return Err(AuthError::Internal(e.to_string())),
        };

        if !self
            .verify(request.current_password, account.password_hash.clone())
            .await?
        {
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = self.hash(request.new_password).await?;
        self.directory
            .update(user.id, skillswap_core::UserUpdate::password_hash(new_hash))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        self.registry.revoke(&user.token);
        self.store.deactivate_all_for_user(user.id);

        audit_log(
            ctx,
            &AuditEvent::PasswordChange {
                user_id: user.id,
                email: user.email.clone(),
            },
        );

        Ok(())
    }

    /// Look up the caller's current profile
    pub async fn me(&self, user_id: Uuid) -> Result<UserInfo, AuthError> {
        match self.directory.find_by_id(user_id).await {
            Ok(user) => Ok(UserInfo::from(&user)),
            Err(DirectoryError::UserNotFound) => Err(AuthError::UserNotFound),
            Err(e) => Err(AuthError::Internal(e.to_string())),
        }
    }

    /// Mint an access/refresh pair and record the refresh token
    fn issue_tokens(&self, user: &User) -> Result<TokenPair, AuthError> {
        let access_token = self
            .codec
            .mint_access(user)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let (refresh_token, token_id) = self
            .codec
            .mint_refresh(user)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        self.store.insert(
            token_id,
            user.id,
            refresh_token.clone(),
            Utc::now() + self.refresh_ttl,
        );

        Ok(TokenPair {
            access_token,
            refresh_token: Some(refresh_token),
            token_type: "Bearer".to_string(),
            expires_in: self.codec.access_ttl_secs(),
        })
    }

    /// Argon2 is deliberately slow; run it off the async executor
    async fn hash(&self, password: String) -> Result<String, AuthError> {
        let config = self.password.clone();
        tokio::task::spawn_blocking(move || hash_password_with_config(&password, &config))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    async fn verify(&self, password: String, hash: String) -> Result<bool, AuthError> {
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillswap_core::InMemoryUserDirectory;

    fn test_service() -> AuthService {
        let auth_config = AuthConfig {
            access_secret: "service-access-secret".to_string(),
            refresh_secret: "service-refresh-secret".to_string(),
            // Light hashing parameters to keep the suite fast
            argon_memory_kib: 8192,
            argon_iterations: 1,
            argon_parallelism: 1,
            ..Default::default()
        };

        AuthService::new(
            Arc::new(InMemoryUserDirectory::new()),
            Arc::new(TokenCodec::new(&auth_config)),
            Arc::new(RefreshTokenStore::new()),
            Arc::new(RevocationRegistry::new(Duration::days(1))),
            &auth_config,
        )
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "Sup3r$ecret".to_string(),
            name: "Alice".to_string(),
        }
    }

    fn ctx() -> AuditContext {
        AuditContext::default()
    }

    fn authed(response: &AuthResponse) -> AuthenticatedUser {
        AuthenticatedUser {
            id: response.user.id,
            email: response.user.email.clone(),
            role: UserRole::parse(&response.user.role).unwrap(),
            token: response.tokens.access_token.clone(),
        }
    }

    #[tokio::test]
    async fn test_register_issues_both_tokens() {
        let service = test_service();
        let response = service
            .register(register_request("alice@example.com"), &ctx())
            .await
            .unwrap();

        assert!(response.success);
        assert!(!response.tokens.access_token.is_empty());
        assert!(response.tokens.refresh_token.is_some());
        assert_eq!(response.tokens.token_type, "Bearer");
        assert_eq!(response.user.role, "student");
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts_case_insensitively() {
        let service = test_service();
        service
            .register(register_request("alice@example.com"), &ctx())
            .await
            .unwrap();

        let result = service
            .register(register_request("Alice@Example.COM"), &ctx())
            .await;
        assert!(matches!(result, Err(AuthError::UserExists)));
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let service = test_service();
        let result = service
            .register(
                RegisterRequest {
                    email: "alice@example.com".to_string(),
                    password: "weak".to_string(),
                    name: "Alice".to_string(),
                },
                &ctx(),
            )
            .await;
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let service = test_service();
        service
            .register(register_request("alice@example.com"), &ctx())
            .await
            .unwrap();

        let unknown = service
            .login(
                LoginRequest {
                    email: "ghost@example.com".to_string(),
                    password: "Sup3r$ecret".to_string(),
                },
                &ctx(),
            )
            .await
            .unwrap_err();

        let wrong_password = service
            .login(
                LoginRequest {
                    email: "alice@example.com".to_string(),
                    password: "Wr0ng!Password".to_string(),
                },
                &ctx(),
            )
            .await
            .unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong_password.to_string());
    }

    #[tokio::test]
    async fn test_login_stamps_last_login() {
        let service = test_service();
        service
            .register(register_request("alice@example.com"), &ctx())
            .await
            .unwrap();

        let response = service
            .login(
                LoginRequest {
                    email: "alice@example.com".to_string(),
                    password: "Sup3r$ecret".to_string(),
                },
                &ctx(),
            )
            .await
            .unwrap();

        let profile = service.me(response.user.id).await.unwrap();
        assert!(profile.last_login.is_some());
    }

    #[tokio::test]
    async fn test_refresh_reissues_access_without_rotating() {
        let service = test_service();
        let registered = service
            .register(register_request("alice@example.com"), &ctx())
            .await
            .unwrap();
        let refresh_token = registered.tokens.refresh_token.clone().unwrap();

        let refreshed = service
            .refresh(
                RefreshRequest {
                    refresh_token: Some(refresh_token.clone()),
                },
                &ctx(),
            )
            .await
            .unwrap();

        assert!(refreshed.tokens.refresh_token.is_none());
        assert!(!refreshed.tokens.access_token.is_empty());

        // Same refresh token keeps working: no rotation
        assert!(service
            .refresh(
                RefreshRequest {
                    refresh_token: Some(refresh_token),
                },
                &ctx(),
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_refresh_requires_a_token() {
        let service = test_service();
        let missing = service
            .refresh(RefreshRequest { refresh_token: None }, &ctx())
            .await;
        assert!(matches!(missing, Err(AuthError::RefreshTokenRequired)));

        let empty = service
            .refresh(
                RefreshRequest {
                    refresh_token: Some(String::new()),
                },
                &ctx(),
            )
            .await;
        assert!(matches!(empty, Err(AuthError::RefreshTokenRequired)));
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let service = test_service();
        let registered = service
            .register(register_request("alice@example.com"), &ctx())
            .await
            .unwrap();

        let result = service
            .refresh(
                RefreshRequest {
                    refresh_token: Some(registered.tokens.access_token),
                },
                &ctx(),
            )
            .await;
        assert!(matches!(result, Err(AuthError::RefreshTokenInvalid)));
    }

    #[tokio::test]
    async fn test_logout_kills_refresh_record() {
        let service = test_service();
        let registered = service
            .register(register_request("alice@example.com"), &ctx())
            .await
            .unwrap();
        let refresh_token = registered.tokens.refresh_token.clone().unwrap();
        let user = authed(&registered);

        service
            .logout(
                &user,
                LogoutRequest {
                    refresh_token: Some(refresh_token.clone()),
                },
                &ctx(),
            )
            .await
            .unwrap();

        assert!(service.registry.is_revoked(&user.token));
        let result = service
            .refresh(
                RefreshRequest {
                    refresh_token: Some(refresh_token),
                },
                &ctx(),
            )
            .await;
        assert!(matches!(result, Err(AuthError::RefreshTokenInvalid)));
    }

    #[tokio::test]
    async fn test_logout_survives_invalid_refresh_token() {
        let service = test_service();
        let registered = service
            .register(register_request("alice@example.com"), &ctx())
            .await
            .unwrap();
        let user = authed(&registered);

        // Garbage refresh token: logout must still revoke the access token
        service
            .logout(
                &user,
                LogoutRequest {
                    refresh_token: Some("garbage".to_string()),
                },
                &ctx(),
            )
            .await
            .unwrap();

        assert!(service.registry.is_revoked(&user.token));
    }

    #[tokio::test]
    async fn test_logout_all_ends_every_session() {
        let service = test_service();
        let registered = service
            .register(register_request("alice@example.com"), &ctx())
            .await
            .unwrap();
        let first_refresh = registered.tokens.refresh_token.clone().unwrap();

        // Second session via login
        let second = service
            .login(
                LoginRequest {
                    email: "alice@example.com".to_string(),
                    password: "Sup3r$ecret".to_string(),
                },
                &ctx(),
            )
            .await
            .unwrap();
        let second_refresh = second.tokens.refresh_token.clone().unwrap();

        let user = authed(&second);
        service.logout_all(&user, &ctx()).await.unwrap();

        for token in [first_refresh, second_refresh] {
            let result = service
                .refresh(
                    RefreshRequest {
                        refresh_token: Some(token),
                    },
                    &ctx(),
                )
                .await;
            assert!(matches!(result, Err(AuthError::RefreshTokenInvalid)));
        }
    }

    #[tokio::test]
    async fn test_change_password_invalidates_all_sessions() {
        let service = test_service();
        let registered = service
            .register(register_request("alice@example.com"), &ctx())
            .await
            .unwrap();
        let refresh_token = registered.tokens.refresh_token.clone().unwrap();
        let user = authed(&registered);

        service
            .change_password(
                &user,
                ChangePasswordRequest {
                    current_password: "Sup3r$ecret".to_string(),
                    new_password: "N3w!Password".to_string(),
                },
                &ctx(),
            )
            .await
            .unwrap();

        assert!(service.registry.is_revoked(&user.token));
        assert!(matches!(
            service
                .refresh(
                    RefreshRequest {
                        refresh_token: Some(refresh_token),
                    },
                    &ctx(),
                )
                .await,
            Err(AuthError::RefreshTokenInvalid)
        ));

        // Old password dead, new password works
        assert!(matches!(
            service
                .login(
                    LoginRequest {
                        email: "alice@example.com".to_string(),
                        password: "Sup3r$ecret".to_string(),
                    },
                    &ctx(),
                )
                .await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(service
            .login(
                LoginRequest {
                    email: "alice@example.com".to_string(),
                    password: "N3w!Password".to_string(),
                },
                &ctx(),
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_change_password_rejects_wrong_current() {
        let service = test_service();
        let registered = service
            .register(register_request("alice@example.com"), &ctx())
            .await
            .unwrap();
        let user = authed(&registered);

        let result = service
            .change_password(
                &user,
                ChangePasswordRequest {
                    current_password: "Wr0ng!Password".to_string(),
                    new_password: "N3w!Password".to_string(),
                },
                &ctx(),
            )
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }
}
