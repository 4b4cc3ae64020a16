//! JWS signing algorithm catalog

use std::str::FromStr;

use jsonwebtoken::Algorithm;

use super::ecdsa::EcdsaCurve;
use crate::error::{ApiError, Result};

/// Every algorithm identifier offered for key material, in display order.
/// The empty entry stands for "no algorithm selected".
pub const KEY_ALGORITHMS: [&str; 15] = [
    "", "EdDSA", "ES256", "ES256K", "ES384", "ES512", "HS256", "HS384", "HS512", "PS256", "PS384",
    "PS512", "RS256", "RS384", "RS512",
];

/// List the supported algorithms with `default_algorithm` moved to the front
pub fn supported_algorithms(default_algorithm: &str) -> Vec<String> {
    std::iter::once(default_algorithm)
        .chain(
            KEY_ALGORITHMS
                .iter()
                .copied()
                .filter(|alg| *alg != default_algorithm),
        )
        .map(str::to_string)
        .collect()
}

/// An algorithm a token signature can be verified with using a public key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// Verified by jsonwebtoken
    Jwt(Algorithm),
    /// ECDSA curve verified by aws-lc-rs
    Ecdsa(EcdsaCurve),
}

impl SignatureAlgorithm {
    /// Parse a JWS `alg` name
    ///
    /// HMAC algorithms are refused since they need a shared secret.
    pub fn from_name(name: &str) -> Result<Self> {
        if let Some(curve) = EcdsaCurve::from_algorithm(name) {
            return Ok(Self::Ecdsa(curve));
        }

        let algorithm = Algorithm::from_str(name)
            .map_err(|_| ApiError::invalid_argument(format!("unsupported key algorithm '{}'", name)))?;

        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                Err(ApiError::invalid_argument(format!(
                    "algorithm '{}' needs a shared secret, not a public key",
                    name
                )))
            }
            _ => Ok(Self::Jwt(algorithm)),
        }
    }

    /// JWS `alg` name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Jwt(algorithm) => jwt_algorithm_name(*algorithm),
            Self::Ecdsa(curve) => curve.algorithm(),
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn jwt_algorithm_name(algorithm: Algorithm) -> &'static str {
    match algorithm {
        Algorithm::HS256 => "HS256",
        Algorithm::HS384 => "HS384",
        Algorithm::HS512 => "HS512",
        Algorithm::ES256 => "ES256",
        Algorithm::ES384 => "ES384",
        Algorithm::RS256 => "RS256",
        Algorithm::RS384 => "RS384",
        Algorithm::RS512 => "RS512",
        Algorithm::PS256 => "PS256",
        Algorithm::PS384 => "PS384",
        Algorithm::PS512 => "PS512",
        Algorithm::EdDSA => "EdDSA",
    }
}
