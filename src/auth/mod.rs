//! API token handling for write requests.

pub mod token_store;

pub use token_store::{FileTokenStorage, MemoryTokenStorage, TOKEN_HEADER, TokenStorage, TokenStore};
