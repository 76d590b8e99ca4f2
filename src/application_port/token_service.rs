use crate::domain_model::{Identity, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username already exists")]
    UsernameTaken,
    #[error("User not found or disabled")]
    UserNotFoundOrDisabled,
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Outcome of access-token validation. Serialized as-is on the wire, so
/// the gateway can parse the validation endpoint's response back into it.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCheck {
    pub is_valid: bool,
    pub username: String,
    pub roles: BTreeSet<String>,
}

impl AccessCheck {
    pub fn valid(username: impl Into<String>, roles: BTreeSet<String>) -> Self {
        AccessCheck {
            is_valid: true,
            username: username.into(),
            roles,
        }
    }

    /// The one shape every failure collapses to. Carries no subject, no
    /// reason; a rejected token learns nothing from the response.
    pub fn invalid() -> Self {
        AccessCheck {
            is_valid: false,
            username: String::new(),
            roles: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerifiedClaims {
    pub subject: String,
    pub identity: Identity,
    pub expires_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    /// Mint an access token embedding the resolved privileges.
    async fn issue_access(
        &self,
        username: &str,
        identity: &Identity,
    ) -> Result<(String, DateTime<Utc>), AuthError>;
    /// Mint a refresh token. Carries the subject only, no privileges.
    async fn issue_refresh(&self, username: &str) -> Result<(String, DateTime<Utc>), AuthError>;
    async fn verify_access(&self, token: &str) -> Result<VerifiedClaims, AuthError>;
    async fn verify_refresh(&self, token: &str) -> Result<VerifiedClaims, AuthError>;
    /// Best-effort subject for logout: requires a valid signature but
    /// ignores expiry, so an expired access token can still end its session.
    async fn extract_subject(&self, token: &str) -> Option<String>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    async fn register(&self, request: RegisterInput) -> Result<UserId, AuthError>;
    async fn authenticate(&self, request: LoginInput) -> Result<TokenPair, AuthError>;
    /// Never fails. Signature, expiry, subject and store mismatches, and
    /// any store error all collapse to `AccessCheck::invalid()`.
    async fn validate_access(&self, token: &str) -> AccessCheck;
    /// Same collapse for the refresh class, reduced to a bool.
    async fn validate_refresh(&self, token: &str) -> bool;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
    /// Idempotent. An unparseable token is a no-op, not an error.
    async fn logout(&self, access_token: &str) -> Result<(), AuthError>;
    /// Administrative logout, no token needed.
    async fn revoke(&self, username: &str) -> Result<(), AuthError>;
}
