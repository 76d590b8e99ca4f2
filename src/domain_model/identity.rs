use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A user's current privileges as read from the relational store.
///
/// Sets are ordered so claims serialized from the same state come out
/// as the same token bytes.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub roles: BTreeSet<String>,
    pub permissions: BTreeSet<String>,
}

impl Identity {
    pub fn empty() -> Self {
        Identity::default()
    }
}
