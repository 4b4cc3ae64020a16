//! oidc-probe-core: Platform-agnostic core logic for OIDC conformance probing
//!
//! This crate contains issuer discovery, client-credentials token
//! acquisition, token verification and the end-to-end flow built from them.
//! It depends only on abstract platform traits (HttpClient, FileSystem,
//! Clock, Environment) and never imports platform-specific code.

pub mod config;
pub mod error;
pub mod flows;
pub mod oidc;
pub mod platform;
pub mod token;

#[cfg(test)]
pub mod test_support;
