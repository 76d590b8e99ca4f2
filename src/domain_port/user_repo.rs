use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert the credential row. Must fail with `UsernameTaken` on a
    /// duplicate username so racing registrations resolve correctly.
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(), AuthError>;

    /// Assign a role by name inside the registration transaction.
    async fn assign_role_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        role: &str,
    ) -> Result<(), AuthError>;

    /// Fetch the credential by username (for login).
    async fn get_by_username(&self, username: &str)
    -> Result<Option<CredentialRecord>, AuthError>;

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError>;
}
