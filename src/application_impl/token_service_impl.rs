use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Role assigned to every new registration.
pub const DEFAULT_ROLE: &str = "USER";

pub struct RealTokenService {
    user_repo: Arc<dyn UserRepo>,
    identity_resolver: Arc<dyn IdentityResolver>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn SessionStore>,
    tx_manager: Arc<dyn TxManager>,
}

impl RealTokenService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        identity_resolver: Arc<dyn IdentityResolver>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn SessionStore>,
        tx_manager: Arc<dyn TxManager>,
    ) -> Self {
        Self {
            user_repo,
            identity_resolver,
            credential_hasher,
            token_codec,
            session_store,
            tx_manager,
        }
    }

    fn ttl_secs(until: DateTime<Utc>) -> u64 {
        let now = Utc::now();
        let secs = (until - now).num_seconds();
        if secs <= 0 { 1 } else { secs as u64 }
    }

    /// Mint and store a fresh pair for `username`. Privileges come from
    /// the resolver now, never from any older token's claims. Both puts
    /// overwrite, which is what ends the previous session.
    async fn issue_session(&self, username: &str) -> Result<TokenPair, AuthError> {
        let identity = self.identity_resolver.resolve(username).await?;

        let (access_token, access_exp) =
            self.token_codec.issue_access(username, &identity).await?;
        let (refresh_token, refresh_exp) = self.token_codec.issue_refresh(username).await?;

        self.session_store
            .put(
                TokenClass::Access,
                username,
                &access_token,
                Self::ttl_secs(access_exp),
            )
            .await?;
        self.session_store
            .put(
                TokenClass::Refresh,
                username,
                &refresh_token,
                Self::ttl_secs(refresh_exp),
            )
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Full access check: signature, expiry and subject via the codec,
    /// then exact string equality with the stored current token.
    async fn check_access(&self, token: &str) -> Result<AccessCheck, AuthError> {
        let claims = self.token_codec.verify_access(token).await?;
        match self
            .session_store
            .get(TokenClass::Access, &claims.subject)
            .await?
        {
            Some(current) if current == token => {
                Ok(AccessCheck::valid(claims.subject, claims.identity.roles))
            }
            _ => Err(AuthError::TokenInvalid),
        }
    }

    async fn check_refresh(&self, token: &str) -> Result<String, AuthError> {
        let claims = self.token_codec.verify_refresh(token).await?;
        match self
            .session_store
            .get(TokenClass::Refresh, &claims.subject)
            .await?
        {
            Some(current) if current == token => Ok(claims.subject),
            _ => Err(AuthError::TokenInvalid),
        }
    }
}

#[async_trait::async_trait]
impl TokenService for RealTokenService {
    async fn register(&self, request: RegisterInput) -> Result<UserId, AuthError> {
        let RegisterInput {
            username,
            password,
            email,
        } = request;

        if self.user_repo.username_exists(&username).await? {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = self.credential_hasher.hash_password(&password).await?;

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let user_id = UserId::generate();

        self.user_repo
            .create_in_tx(tx.as_mut(), user_id, &username, &email, &password_hash)
            .await?;
        self.user_repo
            .assign_role_in_tx(tx.as_mut(), user_id, DEFAULT_ROLE)
            .await?;

        tx.commit()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        info!("registered user {} ({})", username, user_id);
        Ok(user_id)
    }

    async fn authenticate(&self, request: LoginInput) -> Result<TokenPair, AuthError> {
        let LoginInput { username, password } = request;

        let rec = self
            .user_repo
            .get_by_username(&username)
            .await?
            .ok_or(AuthError::UserNotFoundOrDisabled)?;

        if !rec.enabled {
            return Err(AuthError::UserNotFoundOrDisabled);
        }

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidPassword);
        }

        let pair = self.issue_session(&username).await?;
        info!(
            "session issued for {} (access {})",
            username,
            token_fingerprint(&pair.access_token)
        );
        Ok(pair)
    }

    async fn validate_access(&self, token: &str) -> AccessCheck {
        match self.check_access(token).await {
            Ok(check) => check,
            Err(e) => {
                debug!(
                    "access token {} rejected: {}",
                    token_fingerprint(token),
                    e
                );
                AccessCheck::invalid()
            }
        }
    }

    async fn validate_refresh(&self, token: &str) -> bool {
        match self.check_refresh(token).await {
            Ok(_) => true,
            Err(e) => {
                debug!(
                    "refresh token {} rejected: {}",
                    token_fingerprint(token),
                    e
                );
                false
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let username = match self.check_refresh(refresh_token).await {
            Ok(username) => username,
            Err(e) => {
                debug!(
                    "refresh with token {} rejected: {}",
                    token_fingerprint(refresh_token),
                    e
                );
                return Err(AuthError::InvalidRefreshToken);
            }
        };

        let pair = self.issue_session(&username).await?;
        info!(
            "session rotated for {} (access {})",
            username,
            token_fingerprint(&pair.access_token)
        );
        Ok(pair)
    }

    async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        let Some(username) = self.token_codec.extract_subject(access_token).await else {
            debug!(
                "logout with unusable token {}, nothing to do",
                token_fingerprint(access_token)
            );
            return Ok(());
        };
        self.revoke(&username).await
    }

    async fn revoke(&self, username: &str) -> Result<(), AuthError> {
        self.session_store
            .delete(TokenClass::Access, username)
            .await?;
        self.session_store
            .delete(TokenClass::Refresh, username)
            .await?;
        info!("session ended for {}", username);
        Ok(())
    }
}
