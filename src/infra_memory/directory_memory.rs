use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::BTreeSet;

/// In-process user directory: one struct carries both the credential
/// store and the role/permission relations, so a role written during
/// registration is visible to `resolve` the way the relational joins
/// make it in production. Writes apply immediately; the no-op memory
/// transaction does not undo them on rollback.
#[derive(Default)]
pub struct MemoryDirectory {
    users: DashMap<String, CredentialRecord>,
    user_roles: DashMap<String, BTreeSet<String>>,
    role_permissions: DashMap<String, BTreeSet<String>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        let directory = Self::default();
        directory
            .role_permissions
            .insert("USER".to_string(), BTreeSet::new());
        directory
    }

    fn username_of(&self, user_id: UserId) -> Option<String> {
        self.users
            .iter()
            .find(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.key().clone())
    }

    /// Replace a user's role set, registering unseen roles on the way.
    pub fn set_user_roles<I, S>(&self, username: &str, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles: BTreeSet<String> = roles.into_iter().map(Into::into).collect();
        for role in &roles {
            self.role_permissions.entry(role.clone()).or_default();
        }
        self.user_roles.insert(username.to_string(), roles);
    }

    pub fn grant_role_permissions<I, S>(&self, role: &str, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.role_permissions
            .entry(role.to_string())
            .or_default()
            .extend(permissions.into_iter().map(Into::into));
    }

    pub fn set_enabled(&self, username: &str, enabled: bool) {
        if let Some(mut entry) = self.users.get_mut(username) {
            entry.enabled = enabled;
        }
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryDirectory {
    async fn create_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        use dashmap::mapref::entry::Entry;

        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => Err(AuthError::UsernameTaken),
            Entry::Vacant(slot) => {
                slot.insert(CredentialRecord {
                    user_id,
                    username: username.to_string(),
                    email: email.to_string(),
                    password_hash: password_hash.to_string(),
                    enabled: true,
                    created_at: Utc::now(),
                });
                Ok(())
            }
        }
    }

    async fn assign_role_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        role: &str,
    ) -> Result<(), AuthError> {
        if !self.role_permissions.contains_key(role) {
            return Err(AuthError::Store(format!("role not found: {role}")));
        }
        let username = self
            .username_of(user_id)
            .ok_or_else(|| AuthError::Store(format!("no user with id {user_id}")))?;
        self.user_roles
            .entry(username)
            .or_default()
            .insert(role.to_string());
        Ok(())
    }

    async fn get_by_username(
        &self,
        username: &str,
    ) -> Result<Option<CredentialRecord>, AuthError> {
        Ok(self.users.get(username).map(|entry| entry.value().clone()))
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        Ok(self.users.contains_key(username))
    }
}

#[async_trait::async_trait]
impl IdentityResolver for MemoryDirectory {
    async fn resolve(&self, username: &str) -> Result<Identity, AuthError> {
        let roles = self
            .user_roles
            .get(username)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        let mut permissions = BTreeSet::new();
        for role in &roles {
            if let Some(entry) = self.role_permissions.get(role) {
                permissions.extend(entry.value().iter().cloned());
            }
        }

        Ok(Identity { roles, permissions })
    }
}
