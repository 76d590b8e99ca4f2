use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::MySqlPool;
use std::collections::BTreeSet;

/// Resolves privileges with two joins against current relational state.
/// No caching; staleness of issued tokens is bounded by the access TTL,
/// not by this adapter.
pub struct MySqlIdentityResolver {
    pool: MySqlPool,
}

impl MySqlIdentityResolver {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlIdentityResolver { pool }
    }
}

#[async_trait::async_trait]
impl IdentityResolver for MySqlIdentityResolver {
    async fn resolve(&self, username: &str) -> Result<Identity, AuthError> {
        let roles: Vec<String> = sqlx::query_scalar(
            r#"
SELECT r.name FROM users u
JOIN user_roles ur ON u.user_id = ur.user_id
JOIN roles r ON ur.role_id = r.id
WHERE u.username = ?
"#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        let permissions: Vec<String> = sqlx::query_scalar(
            r#"
SELECT p.name FROM users u
JOIN user_roles ur ON u.user_id = ur.user_id
JOIN role_permissions rp ON ur.role_id = rp.role_id
JOIN permissions p ON rp.permission_id = p.id
WHERE u.username = ?
"#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(Identity {
            roles: BTreeSet::from_iter(roles),
            permissions: BTreeSet::from_iter(permissions),
        })
    }
}
