// store

mod session_store;

pub use session_store::*;

// repo

mod identity_resolver;
mod user_repo;

mod repo_tx;

pub use identity_resolver::*;
pub use user_repo::*;

pub use repo_tx::*;
