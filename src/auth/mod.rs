//! Credentials and bearer tokens for remote sessions.

pub mod credentials;
mod token_exchange;
mod token_manager;
pub mod token_provider;

pub use credentials::ServiceAccountKey;
pub use token_provider::{ServiceAccountTokenProvider, StaticTokenProvider};
