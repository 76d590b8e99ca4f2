mod jwt_codec;
mod password_hasher;
mod token_service_impl;

pub use jwt_codec::*;
pub use password_hasher::*;
pub use token_service_impl::*;
