//! OIDC (OpenID Connect) module
//!
//! Issuer discovery, the signing algorithm catalog, key set handling and
//! token verification.

pub mod algorithms;
pub mod discovery;
pub mod ecdsa;
mod jwks;
pub mod metadata;
pub mod verify;

pub use algorithms::{supported_algorithms, SignatureAlgorithm, KEY_ALGORITHMS};
pub use discovery::{resolve_issuer, IssuerMetadata};
pub use metadata::{select_fields, MetadataField};
pub use verify::{
    verify, verify_with_metadata, DecodedToken, TokenHeader, TrustMode, VerificationRequest,
};
