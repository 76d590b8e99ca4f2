use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Token class. Exactly one token per (user, class) is valid at a time;
/// the session store record under `session_key` is the arbiter.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    Access,
    Refresh,
}

impl TokenClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenClass::Access => "access",
            TokenClass::Refresh => "refresh",
        }
    }

    /// Session store key for a user's current token of this class.
    /// The layout is part of the external contract; deployments share it
    /// with operational tooling.
    pub fn session_key(&self, username: &str) -> String {
        match self {
            TokenClass::Access => format!("access_token:{username}"),
            TokenClass::Refresh => format!("refresh_token:{username}"),
        }
    }
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short stable digest of a token for log lines. Raw tokens never go to
/// the log; equal tokens hash equal, which is all correlation needs.
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let hash = hex::encode(hasher.finalize());
    hash[..16].to_string()
}
