//! JWKS (JSON Web Key Set) handling
//!
//! Fetches a key set and picks the key a token was signed with. Key sets are
//! fetched once per verification and never cached.

use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk};
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::algorithms::SignatureAlgorithm;
use super::ecdsa::{EcdsaCurve, EcdsaPublicKey};
use crate::config::USER_AGENT;
use crate::error::{ApiError, Result};
use crate::platform::HttpClient;

/// Usable signing keys of a published key set
///
/// Entries that are not signing keys or that cannot be imported are dropped
/// while parsing, so one exotic key does not invalidate the whole set.
#[derive(Debug, Clone)]
pub struct KeySet {
    keys: Vec<PublishedKey>,
}

/// One usable key and the identifiers it was published with
#[derive(Debug, Clone)]
pub struct PublishedKey {
    pub kid: Option<String>,
    pub alg: Option<String>,
    pub material: KeyMaterial,
}

#[derive(Debug, Clone)]
pub enum KeyMaterial {
    /// Key type jsonwebtoken can import
    Jwk(Jwk),
    /// Key on a curve verified through aws-lc-rs
    Ecdsa(EcdsaPublicKey),
}

#[derive(Deserialize)]
struct RawKeySet {
    keys: Vec<Value>,
}

impl KeySet {
    /// Parse a JWKS document
    ///
    /// Only a document without a `keys` array is an error.
    pub fn from_document(document: &[u8]) -> Result<Self> {
        let raw: RawKeySet = serde_json::from_slice(document)
            .map_err(|e| ApiError::verification_failed(format!("invalid JWKS: {}", e)))?;

        let keys = raw
            .keys
            .iter()
            .filter_map(|entry| match parse_key(entry) {
                Ok(key) => Some(key),
                Err(reason) => {
                    debug!(kid = ?entry.get("kid"), reason = %reason, "skipping JWKS entry");
                    None
                }
            })
            .collect();

        Ok(Self { keys })
    }

    fn find(&self, kid: &str) -> Option<&PublishedKey> {
        self.keys.iter().find(|key| key.kid.as_deref() == Some(kid))
    }
}

fn parse_key(entry: &Value) -> std::result::Result<PublishedKey, String> {
    let member = |name: &str| entry.get(name).and_then(Value::as_str);

    if let Some(key_use) = member("use") {
        if key_use != "sig" {
            return Err(format!("key use is '{}'", key_use));
        }
    }

    let curve = member("crv").and_then(EcdsaCurve::from_crv);
    let material = match (member("kty"), curve) {
        (Some("EC"), Some(curve)) => {
            let x = member("x").ok_or("EC key without 'x'")?;
            let y = member("y").ok_or("EC key without 'y'")?;
            let key = EcdsaPublicKey::from_coordinates(curve, x, y).map_err(|e| e.to_string())?;
            KeyMaterial::Ecdsa(key)
        }
        _ => {
            let jwk: Jwk = serde_json::from_value(entry.clone()).map_err(|e| e.to_string())?;
            KeyMaterial::Jwk(jwk)
        }
    };

    Ok(PublishedKey {
        kid: member("kid").map(str::to_string),
        alg: member("alg").map(str::to_string),
        material,
    })
}

/// Fetch JWKS from a URI
pub async fn fetch_jwks(jwks_uri: &str, http: &dyn HttpClient) -> Result<KeySet> {
    debug!(url = %jwks_uri, "fetching key set");

    let response = http
        .get(
            jwks_uri,
            &[("Accept", "application/json"), ("User-Agent", USER_AGENT)],
        )
        .await
        .map_err(|e| ApiError::upstream_error(format!("failed to fetch JWKS: {}", e)))?;

    if !response.is_success() {
        return Err(ApiError::upstream_error(format!(
            "failed to fetch JWKS: HTTP {}",
            response.status
        )));
    }

    let keys = KeySet::from_document(&response.body)?;
    debug!(usable = keys.keys.len(), "parsed key set");
    Ok(keys)
}

/// Select the key matching the token's algorithm and `kid`
///
/// With a `kid` the key is looked up by id; without one, exactly one key
/// usable for the algorithm must be published.
pub fn select_key<'a>(
    keys: &'a KeySet,
    algorithm: SignatureAlgorithm,
    kid: Option<&str>,
) -> Result<&'a PublishedKey> {
    let key = match kid {
        Some(kid) => keys.find(kid).ok_or_else(|| {
            ApiError::verification_failed(format!("key '{}' not found in JWKS", kid))
        })?,
        None => {
            let mut candidates = keys
                .keys
                .iter()
                .filter(|key| fits_algorithm(key, algorithm) && declared_alg_matches(key, algorithm));

            let first = candidates.next().ok_or_else(|| {
                ApiError::verification_failed(format!(
                    "no key in JWKS matches algorithm {}",
                    algorithm
                ))
            })?;
            if candidates.next().is_some() {
                return Err(ApiError::verification_failed(
                    "multiple keys in JWKS match and the token has no 'kid' header",
                ));
            }
            first
        }
    };

    if !fits_algorithm(key, algorithm) {
        return Err(ApiError::verification_failed(format!(
            "key type does not fit algorithm {}",
            algorithm
        )));
    }

    if !declared_alg_matches(key, algorithm) {
        return Err(ApiError::verification_failed(format!(
            "key is restricted to a different algorithm than {}",
            algorithm
        )));
    }

    Ok(key)
}

/// Whether the key type and curve can carry a signature of `algorithm`
fn fits_algorithm(key: &PublishedKey, algorithm: SignatureAlgorithm) -> bool {
    match (&key.material, algorithm) {
        (KeyMaterial::Ecdsa(ecdsa), SignatureAlgorithm::Ecdsa(curve)) => ecdsa.curve() == curve,
        (KeyMaterial::Jwk(jwk), SignatureAlgorithm::Jwt(alg)) => match &jwk.algorithm {
            AlgorithmParameters::RSA(_) => matches!(
                alg,
                Algorithm::RS256
                    | Algorithm::RS384
                    | Algorithm::RS512
                    | Algorithm::PS256
                    | Algorithm::PS384
                    | Algorithm::PS512
            ),
            AlgorithmParameters::EllipticCurve(params) => matches!(
                (alg, &params.curve),
                (Algorithm::ES256, EllipticCurve::P256) | (Algorithm::ES384, EllipticCurve::P384)
            ),
            AlgorithmParameters::OctetKeyPair(params) => {
                alg == Algorithm::EdDSA && params.curve == EllipticCurve::Ed25519
            }
            AlgorithmParameters::OctetKey(_) => false,
        },
        _ => false,
    }
}

/// A key without an `alg` member may be used with any fitting algorithm
fn declared_alg_matches(key: &PublishedKey, algorithm: SignatureAlgorithm) -> bool {
    key.alg
        .as_deref()
        .map_or(true, |declared| declared == algorithm.name())
}
