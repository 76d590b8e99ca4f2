mod filter;
mod forward;
mod validator;

pub use filter::*;
pub use forward::*;
pub use validator::*;
