use crate::application_port::*;
use crate::domain_model::*;

/// Read-side join: username to the user's current role and permission
/// sets. No caching. An unknown username resolves to empty sets rather
/// than an error; callers have already established the user exists.
#[async_trait::async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, username: &str) -> Result<Identity, AuthError>;
}
