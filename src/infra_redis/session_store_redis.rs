use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

pub struct RedisSessionStore {
    conn: ConnectionManager,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager) -> Self {
        RedisSessionStore { conn }
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(
        &self,
        class: TokenClass,
        username: &str,
        token: &str,
        ttl_secs: u64,
    ) -> Result<(), AuthError> {
        let key = class.session_key(username);
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(&key, token, ttl_secs)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, class: TokenClass, username: &str) -> Result<Option<String>, AuthError> {
        let key = class.session_key(username);
        let mut conn = self.conn.clone();
        let val: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(val)
    }

    async fn delete(&self, class: TokenClass, username: &str) -> Result<(), AuthError> {
        let key = class.session_key(username);
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(&key)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(())
    }
}
