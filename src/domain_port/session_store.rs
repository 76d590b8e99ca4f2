use crate::application_port::*;
use crate::domain_model::*;

/// Per-user current-token records. One record per (class, user); `put`
/// overwrites whatever was there, which is how an older token of the same
/// class is revoked. TTL expiry is advisory cleanup only; expiry is
/// enforced from the token claims.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(
        &self,
        class: TokenClass,
        username: &str,
        token: &str,
        ttl_secs: u64,
    ) -> Result<(), AuthError>;
    async fn get(&self, class: TokenClass, username: &str) -> Result<Option<String>, AuthError>;
    async fn delete(&self, class: TokenClass, username: &str) -> Result<(), AuthError>;
}
