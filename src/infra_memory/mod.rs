mod directory_memory;
mod session_store_memory;

pub use directory_memory::*;
pub use session_store_memory::*;

mod repo_tx_memory;

pub use repo_tx_memory::*;
