//! ECDSA curves the JWT library does not model
//!
//! ES512 (P-521) and ES256K (secp256k1) signatures are checked with aws-lc-rs.
//! JWT ECDSA signatures are fixed-length R||S, not ASN.1 DER.

use aws_lc_rs::signature::{self, UnparsedPublicKey};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::error::{ApiError, Result};

/// Curve of an ECDSA key verified outside jsonwebtoken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcdsaCurve {
    P521,
    Secp256k1,
}

impl EcdsaCurve {
    /// Curve for a JWS `alg` name
    pub fn from_algorithm(name: &str) -> Option<Self> {
        match name {
            "ES512" => Some(Self::P521),
            "ES256K" => Some(Self::Secp256k1),
            _ => None,
        }
    }

    /// Curve for a JWK `crv` name
    pub fn from_crv(crv: &str) -> Option<Self> {
        match crv {
            "P-521" => Some(Self::P521),
            "secp256k1" => Some(Self::Secp256k1),
            _ => None,
        }
    }

    /// JWS `alg` name
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::P521 => "ES512",
            Self::Secp256k1 => "ES256K",
        }
    }

    /// JWK `crv` name
    pub fn crv(&self) -> &'static str {
        match self {
            Self::P521 => "P-521",
            Self::Secp256k1 => "secp256k1",
        }
    }

    fn coordinate_len(&self) -> usize {
        match self {
            Self::P521 => 66,
            Self::Secp256k1 => 32,
        }
    }

    fn verification_algorithm(&self) -> &'static dyn signature::VerificationAlgorithm {
        match self {
            Self::P521 => &signature::ECDSA_P521_SHA512_FIXED,
            Self::Secp256k1 => &signature::ECDSA_P256K1_SHA256_FIXED,
        }
    }
}

/// Public key on one of the [`EcdsaCurve`]s
///
/// Holds either a DER SubjectPublicKeyInfo (from PEM) or an uncompressed
/// SEC1 point (from JWK coordinates); aws-lc-rs accepts both and rejects
/// keys on a different curve.
#[derive(Debug, Clone, PartialEq)]
pub struct EcdsaPublicKey {
    curve: EcdsaCurve,
    encoded: Vec<u8>,
}

impl EcdsaPublicKey {
    /// Import a `PUBLIC KEY` PEM block
    pub fn from_pem(curve: EcdsaCurve, block: &str) -> Result<Self> {
        let parsed = pem::parse(block)
            .map_err(|e| ApiError::verification_failed(format!("invalid key material: {}", e)))?;

        if parsed.tag() != "PUBLIC KEY" {
            return Err(ApiError::verification_failed(format!(
                "invalid key material: expected a PUBLIC KEY block, found '{}'",
                parsed.tag()
            )));
        }

        Ok(Self {
            curve,
            encoded: parsed.into_contents(),
        })
    }

    /// Import the base64url `x` and `y` members of an EC JWK
    pub fn from_coordinates(curve: EcdsaCurve, x: &str, y: &str) -> Result<Self> {
        let x = decode_coordinate(curve, "x", x)?;
        let y = decode_coordinate(curve, "y", y)?;

        let mut encoded = Vec::with_capacity(1 + x.len() + y.len());
        encoded.push(0x04);
        encoded.extend_from_slice(&x);
        encoded.extend_from_slice(&y);

        Ok(Self { curve, encoded })
    }

    pub fn curve(&self) -> EcdsaCurve {
        self.curve
    }

    /// Check a fixed-length signature over `message`
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        UnparsedPublicKey::new(self.curve.verification_algorithm(), &self.encoded)
            .verify(message, signature)
            .map_err(|_| ApiError::verification_failed("token verification failed: InvalidSignature"))
    }
}

fn decode_coordinate(curve: EcdsaCurve, name: &str, value: &str) -> Result<Vec<u8>> {
    let bytes = URL_SAFE_NO_PAD.decode(value).map_err(|e| {
        ApiError::verification_failed(format!("invalid JWK coordinate '{}': {}", name, e))
    })?;

    if bytes.len() != curve.coordinate_len() {
        return Err(ApiError::verification_failed(format!(
            "JWK coordinate '{}' has {} bytes, {} needs {}",
            name,
            bytes.len(),
            curve.crv(),
            curve.coordinate_len()
        )));
    }
    Ok(bytes)
}
