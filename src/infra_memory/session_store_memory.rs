use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// In-process `SessionStore` with real overwrite and TTL semantics. Backs
/// the `memory` session backend and the deterministic tests; nothing here
/// survives a restart.
#[derive(Default)]
pub struct MemorySessionStore {
    records: DashMap<String, (String, Instant)>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired records, returning how many went away. Reads already
    /// ignore expired entries; this is the advisory cleanup pass.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.records.len();
        self.records.retain(|_, (_, deadline)| *deadline > now);
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(
        &self,
        class: TokenClass,
        username: &str,
        token: &str,
        ttl_secs: u64,
    ) -> Result<(), AuthError> {
        let deadline = Instant::now() + Duration::from_secs(ttl_secs);
        self.records
            .insert(class.session_key(username), (token.to_string(), deadline));
        Ok(())
    }

    async fn get(&self, class: TokenClass, username: &str) -> Result<Option<String>, AuthError> {
        let key = class.session_key(username);
        let now = Instant::now();
        // remove_if holds the shard lock across the expiry check, so it
        // can never take out a record a concurrent put just refreshed.
        self.records
            .remove_if(&key, |_, (_, deadline)| *deadline <= now);
        Ok(self.records.get(&key).and_then(|entry| {
            let (token, deadline) = entry.value();
            if *deadline > now {
                Some(token.clone())
            } else {
                None
            }
        }))
    }

    async fn delete(&self, class: TokenClass, username: &str) -> Result<(), AuthError> {
        self.records.remove(&class.session_key(username));
        Ok(())
    }
}
