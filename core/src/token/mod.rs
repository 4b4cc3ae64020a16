//! Token acquisition

pub mod acquire;

pub use acquire::{GrantRequest, TokenAcquirer, TokenResponse};
