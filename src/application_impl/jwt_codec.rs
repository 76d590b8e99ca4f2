use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

#[derive(Clone)]
pub struct TokenConfig {
    pub signing_key: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("signing_key", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Claim layouts are fixed. An unknown or missing field is a parse
/// failure, never a silent default. `jti` makes two tokens minted within
/// the same second distinct strings, which overwrite revocation needs.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct AccessClaims {
    sub: String,
    iat: i64,
    exp: i64,
    jti: String,
    cls: TokenClass,
    roles: BTreeSet<String>,
    permissions: BTreeSet<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RefreshClaims {
    sub: String,
    iat: i64,
    exp: i64,
    jti: String,
    cls: TokenClass,
}

fn encode_access(
    username: &str,
    identity: &Identity,
    cfg: &TokenConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + cfg.access_ttl;
    let claims = AccessClaims {
        sub: username.to_string(),
        iat: iat_dt.timestamp(),
        exp: exp_dt.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
        cls: TokenClass::Access,
        roles: identity.roles.clone(),
        permissions: identity.permissions.clone(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&cfg.signing_key),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))?;
    Ok((token, exp_dt))
}

fn encode_refresh(username: &str, cfg: &TokenConfig) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + cfg.refresh_ttl;
    let claims = RefreshClaims {
        sub: username.to_string(),
        iat: iat_dt.timestamp(),
        exp: exp_dt.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
        cls: TokenClass::Refresh,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&cfg.signing_key),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))?;
    Ok((token, exp_dt))
}

// Expiry is exact; the default 60s leeway would keep a dead token alive.
fn validation() -> Validation {
    let mut v = Validation::new(Algorithm::HS256);
    v.leeway = 0;
    v.validate_exp = true;
    v
}

fn decode_access(token: &str, cfg: &TokenConfig) -> Result<AccessClaims, AuthError> {
    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(&cfg.signing_key),
        &validation(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    })?;
    if data.claims.cls != TokenClass::Access || data.claims.sub.is_empty() {
        return Err(AuthError::TokenInvalid);
    }
    Ok(data.claims)
}

fn decode_refresh(token: &str, cfg: &TokenConfig) -> Result<RefreshClaims, AuthError> {
    let data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(&cfg.signing_key),
        &validation(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    })?;
    if data.claims.cls != TokenClass::Refresh || data.claims.sub.is_empty() {
        return Err(AuthError::TokenInvalid);
    }
    Ok(data.claims)
}

fn expires_at(exp: i64) -> Result<DateTime<Utc>, AuthError> {
    DateTime::<Utc>::from_timestamp(exp, 0).ok_or(AuthError::TokenInvalid)
}

pub struct JwtHs256Codec {
    cfg: TokenConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: TokenConfig) -> Self {
        JwtHs256Codec { cfg }
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_access(
        &self,
        username: &str,
        identity: &Identity,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        encode_access(username, identity, &self.cfg)
    }

    async fn issue_refresh(&self, username: &str) -> Result<(String, DateTime<Utc>), AuthError> {
        encode_refresh(username, &self.cfg)
    }

    async fn verify_access(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        let claims = decode_access(token, &self.cfg)?;
        Ok(VerifiedClaims {
            subject: claims.sub,
            identity: Identity {
                roles: claims.roles,
                permissions: claims.permissions,
            },
            expires_at: expires_at(claims.exp)?,
        })
    }

    async fn verify_refresh(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        let claims = decode_refresh(token, &self.cfg)?;
        Ok(VerifiedClaims {
            subject: claims.sub,
            identity: Identity::empty(),
            expires_at: expires_at(claims.exp)?,
        })
    }

    async fn extract_subject(&self, token: &str) -> Option<String> {
        let mut v = validation();
        v.validate_exp = false;

        let key = DecodingKey::from_secret(&self.cfg.signing_key);
        let sub = decode::<AccessClaims>(token, &key, &v)
            .map(|data| data.claims.sub)
            .or_else(|_| decode::<RefreshClaims>(token, &key, &v).map(|data| data.claims.sub))
            .ok()?;
        if sub.is_empty() { None } else { Some(sub) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TokenConfig {
        TokenConfig {
            signing_key: b"unit-test-signing-key".to_vec(),
            access_ttl: Duration::from_secs(60),
            refresh_ttl: Duration::from_secs(120),
        }
    }

    fn sample_identity() -> Identity {
        Identity {
            roles: BTreeSet::from(["USER".to_string()]),
            permissions: BTreeSet::from(["profile:read".to_string()]),
        }
    }

    fn raw_token(claims: &serde_json::Value, key: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(key),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn access_claims_round_trip() {
        let codec = JwtHs256Codec::new(test_config());
        let (token, exp) = codec.issue_access("alice", &sample_identity()).await.unwrap();

        let claims = codec.verify_access(&token).await.unwrap();
        assert_eq!(claims.subject, "alice");
        assert_eq!(claims.identity, sample_identity());
        assert_eq!(claims.expires_at.timestamp(), exp.timestamp());
    }

    #[tokio::test]
    async fn tokens_are_unique_within_one_second() {
        let codec = JwtHs256Codec::new(test_config());
        let (a, _) = codec.issue_access("alice", &sample_identity()).await.unwrap();
        let (b, _) = codec.issue_access("alice", &sample_identity()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let codec = JwtHs256Codec::new(test_config());
        let (refresh, _) = codec.issue_refresh("alice").await.unwrap();
        let (access, _) = codec.issue_access("alice", &sample_identity()).await.unwrap();

        assert!(matches!(
            codec.verify_access(&refresh).await,
            Err(AuthError::TokenInvalid)
        ));
        assert!(matches!(
            codec.verify_refresh(&access).await,
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn foreign_key_is_rejected() {
        let codec = JwtHs256Codec::new(test_config());
        let mut other = test_config();
        other.signing_key = b"some-other-key".to_vec();
        let (token, _) = JwtHs256Codec::new(other)
            .issue_access("alice", &sample_identity())
            .await
            .unwrap();

        assert!(matches!(
            codec.verify_access(&token).await,
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn expired_token_is_rejected_but_still_names_its_subject() {
        let cfg = test_config();
        let codec = JwtHs256Codec::new(cfg.clone());
        let now = Utc::now().timestamp();
        let token = raw_token(
            &serde_json::json!({
                "sub": "alice",
                "iat": now - 120,
                "exp": now - 60,
                "jti": "0",
                "cls": "access",
                "roles": ["USER"],
                "permissions": [],
            }),
            &cfg.signing_key,
        );

        assert!(matches!(
            codec.verify_access(&token).await,
            Err(AuthError::TokenExpired)
        ));
        assert_eq!(codec.extract_subject(&token).await.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn unknown_claim_fields_fail_the_parse() {
        let cfg = test_config();
        let codec = JwtHs256Codec::new(cfg.clone());
        let now = Utc::now().timestamp();
        let token = raw_token(
            &serde_json::json!({
                "sub": "alice",
                "iat": now,
                "exp": now + 60,
                "jti": "0",
                "cls": "access",
                "roles": ["USER"],
                "permissions": [],
                "admin": true,
            }),
            &cfg.signing_key,
        );

        assert!(matches!(
            codec.verify_access(&token).await,
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn empty_subject_is_invalid() {
        let cfg = test_config();
        let codec = JwtHs256Codec::new(cfg.clone());
        let now = Utc::now().timestamp();
        let token = raw_token(
            &serde_json::json!({
                "sub": "",
                "iat": now,
                "exp": now + 60,
                "jti": "0",
                "cls": "access",
                "roles": [],
                "permissions": [],
            }),
            &cfg.signing_key,
        );

        assert!(matches!(
            codec.verify_access(&token).await,
            Err(AuthError::TokenInvalid)
        ));
        assert_eq!(codec.extract_subject(&token).await, None);
    }

    #[tokio::test]
    async fn extract_subject_wants_a_valid_signature() {
        let codec = JwtHs256Codec::new(test_config());
        assert_eq!(codec.extract_subject("not-a-jwt").await, None);

        let foreign = raw_token(
            &serde_json::json!({
                "sub": "alice",
                "iat": 0,
                "exp": 0,
                "jti": "0",
                "cls": "access",
                "roles": [],
                "permissions": [],
            }),
            b"some-other-key",
        );
        assert_eq!(codec.extract_subject(&foreign).await, None);
    }
}
