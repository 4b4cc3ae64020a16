//! Token signature verification
//!
//! Verifies a compact JWT under one of two trust models:
//!
//! - **Remote key set**: the issuer's discovery document names a `jwks_uri`;
//!   the key is picked from that set by the token's `kid`.
//! - **Local key file**: a PEM encoded public key read from disk, accepted for
//!   exactly one caller-supplied algorithm.
//!
//! A call moves through input validation, fetching trust material and
//! signature verification. Only a fully verified token yields a
//! [`DecodedToken`]; every failure after input validation is reported as
//! `VerificationFailed` unless it comes from discovery or transport.
//!
//! Algorithms jsonwebtoken models are checked by it; ES512 and ES256K go
//! through [`super::ecdsa`] with the same issuer and timestamp rules.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::algorithms::SignatureAlgorithm;
use super::discovery::{resolve_issuer, IssuerMetadata};
use super::ecdsa::EcdsaPublicKey;
use super::jwks::{fetch_jwks, select_key, KeyMaterial};
use crate::error::{ApiError, Result};
use crate::platform::{Clock, FileSystem, HttpClient};

/// Only PEM encoded key files are accepted
pub const KEY_FILE_EXTENSION: &str = ".pem";

/// Where the verification key comes from
#[derive(Debug, Clone, PartialEq)]
pub enum TrustMode {
    /// Keys published by the issuer at its `jwks_uri`
    RemoteKeySet,
    /// A PEM public key on disk, restricted to `algorithm`
    LocalKeyFile { algorithm: String, path: String },
}

/// A token to verify and the trust it is verified under
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    pub issuer: String,
    pub token: String,
    pub trust: TrustMode,
}

impl VerificationRequest {
    pub fn remote(issuer: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            token: token.into(),
            trust: TrustMode::RemoteKeySet,
        }
    }

    pub fn local(
        issuer: impl Into<String>,
        token: impl Into<String>,
        algorithm: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            token: token.into(),
            trust: TrustMode::LocalKeyFile {
                algorithm: algorithm.into(),
                path: path.into(),
            },
        }
    }

    /// Reject malformed requests before any I/O
    ///
    /// Returns the parsed algorithm for local key files.
    fn validate(&self) -> Result<Option<SignatureAlgorithm>> {
        if self.issuer.trim().is_empty() {
            return Err(ApiError::invalid_argument(
                "There was no issuer to validate the token against!",
            ));
        }

        if self.token.is_empty() {
            return Err(ApiError::invalid_argument("There was no tokenString to decode!"));
        }

        match &self.trust {
            TrustMode::RemoteKeySet => Ok(None),
            TrustMode::LocalKeyFile { algorithm, path } => {
                if algorithm.is_empty() {
                    return Err(ApiError::invalid_argument("Missing algorithm!"));
                }

                if path.is_empty() {
                    return Err(ApiError::invalid_argument("Invalid filepath!"));
                }

                if !path.ends_with(KEY_FILE_EXTENSION) {
                    return Err(ApiError::unsupported_format(
                        "Unsupported file-type (Supported formats: .pem)",
                    ));
                }

                SignatureAlgorithm::from_name(algorithm).map(Some)
            }
        }
    }
}

/// Protected header of a compact JWT, read before the signature is checked
#[derive(Debug, Clone, PartialEq)]
pub struct TokenHeader {
    pub alg: String,
    pub kid: Option<String>,
    raw: Map<String, Value>,
}

impl TokenHeader {
    /// Decode the header segment of `token`
    pub fn parse(token: &str) -> Result<Self> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(ApiError::verification_failed(
                "invalid JWT: expected three dot-separated segments",
            ));
        }

        let raw: Map<String, Value> = serde_json::from_slice(&base64_url_decode(segments[0])?)
            .map_err(|e| ApiError::verification_failed(format!("invalid JWT header: {}", e)))?;

        let alg = raw
            .get("alg")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::verification_failed("invalid JWT header: missing 'alg'"))?
            .to_string();
        let kid = raw.get("kid").and_then(Value::as_str).map(str::to_string);

        Ok(Self { alg, kid, raw })
    }
}

/// Payload and protected header of a verified token, as 2-space indented JSON
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub payload: String,
    pub header: String,
}

impl DecodedToken {
    fn new(claims: &Map<String, Value>, header: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            payload: render(claims)?,
            header: render(header)?,
        })
    }

    /// Payload parsed back into claims
    pub fn claims(&self) -> Result<Map<String, Value>> {
        serde_json::from_str(&self.payload)
            .map_err(|e| ApiError::internal(format!("invalid payload JSON: {}", e)))
    }
}

fn render<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::internal(format!("failed to render token: {}", e)))
}

/// Verify a token, resolving the issuer first in remote key set mode
pub async fn verify(
    request: &VerificationRequest,
    http: &dyn HttpClient,
    files: &dyn FileSystem,
    clock: &dyn Clock,
) -> Result<DecodedToken> {
    let algorithm = request.validate()?;

    match (&request.trust, algorithm) {
        (TrustMode::LocalKeyFile { path, .. }, Some(algorithm)) => {
            verify_with_key_file(request, algorithm, path, files, clock).await
        }
        _ => {
            let metadata = resolve_issuer(&request.issuer, http).await?;
            verify_with_key_set(request, &metadata, http, clock).await
        }
    }
}

/// Verify a token using already resolved issuer metadata for the key set
pub async fn verify_with_metadata(
    request: &VerificationRequest,
    metadata: &IssuerMetadata,
    http: &dyn HttpClient,
    files: &dyn FileSystem,
    clock: &dyn Clock,
) -> Result<DecodedToken> {
    let algorithm = request.validate()?;

    match (&request.trust, algorithm) {
        (TrustMode::LocalKeyFile { path, .. }, Some(algorithm)) => {
            verify_with_key_file(request, algorithm, path, files, clock).await
        }
        _ => verify_with_key_set(request, metadata, http, clock).await,
    }
}

async fn verify_with_key_set(
    request: &VerificationRequest,
    metadata: &IssuerMetadata,
    http: &dyn HttpClient,
    clock: &dyn Clock,
) -> Result<DecodedToken> {
    let header = TokenHeader::parse(&request.token)?;
    let algorithm = token_algorithm(&header)?;

    let keys = fetch_jwks(metadata.jwks_uri()?, http).await?;
    let key = select_key(&keys, algorithm, header.kid.as_deref())?;

    debug!(kid = ?header.kid, alg = %algorithm, "verifying token against key set");
    let decoded = match (&key.material, algorithm) {
        (KeyMaterial::Jwk(jwk), SignatureAlgorithm::Jwt(alg)) => {
            let decoding_key = DecodingKey::from_jwk(jwk)
                .map_err(|e| ApiError::verification_failed(format!("invalid JWK: {}", e)))?;
            check_token(&request.token, &header, &decoding_key, alg, &request.issuer, clock)?
        }
        (KeyMaterial::Ecdsa(ecdsa), SignatureAlgorithm::Ecdsa(_)) => {
            check_ecdsa_token(&request.token, &header, ecdsa, &request.issuer, clock)?
        }
        _ => {
            return Err(ApiError::verification_failed(format!(
                "key type does not fit algorithm {}",
                algorithm
            )))
        }
    };

    info!(issuer = %request.issuer, "token verified against remote key set");
    Ok(decoded)
}

/// Algorithm named by the token header, as far as a public key can check it
fn token_algorithm(header: &TokenHeader) -> Result<SignatureAlgorithm> {
    SignatureAlgorithm::from_name(&header.alg).map_err(|_| {
        if header.alg.starts_with("HS") {
            ApiError::verification_failed(format!(
                "symmetric algorithm {} cannot be verified with a public key set",
                header.alg
            ))
        } else {
            ApiError::verification_failed(format!("unsupported token algorithm '{}'", header.alg))
        }
    })
}

async fn verify_with_key_file(
    request: &VerificationRequest,
    algorithm: SignatureAlgorithm,
    path: &str,
    files: &dyn FileSystem,
    clock: &dyn Clock,
) -> Result<DecodedToken> {
    debug!(path = %path, alg = %algorithm, "reading key file");
    let pem = files.read_to_string(path).await.map_err(|e| {
        ApiError::verification_failed(format!("failed to read key file '{}': {}", path, e))
    })?;

    let decoded = match algorithm {
        SignatureAlgorithm::Jwt(alg) => {
            let key = decoding_key_from_pem(alg, pem.as_bytes())?;
            let header = TokenHeader::parse(&request.token)?;
            check_token(&request.token, &header, &key, alg, &request.issuer, clock)?
        }
        SignatureAlgorithm::Ecdsa(curve) => {
            let key = EcdsaPublicKey::from_pem(curve, &pem)?;
            let header = TokenHeader::parse(&request.token)?;
            check_ecdsa_token(&request.token, &header, &key, &request.issuer, clock)?
        }
    };

    info!(issuer = %request.issuer, path = %path, "token verified against local key file");
    Ok(decoded)
}

/// Import an SPKI public key for the family of `algorithm`
fn decoding_key_from_pem(algorithm: Algorithm, pem: &[u8]) -> Result<DecodingKey> {
    let key = match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem),
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem),
        Algorithm::EdDSA => DecodingKey::from_ed_pem(pem),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            return Err(ApiError::invalid_argument(
                "symmetric algorithms cannot use a public key file",
            ))
        }
    };

    key.map_err(|e| ApiError::verification_failed(format!("invalid key material: {}", e)))
}

/// Check signature, issuer and timestamps with exactly one accepted algorithm
fn check_token(
    token: &str,
    header: &TokenHeader,
    key: &DecodingKey,
    algorithm: Algorithm,
    issuer: &str,
    clock: &dyn Clock,
) -> Result<DecodedToken> {
    // Timestamps are checked against the platform clock below.
    let mut validation = Validation::new(algorithm);
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["iss"]);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;

    let token_data = decode::<Map<String, Value>>(token, key, &validation)
        .map_err(|e| ApiError::verification_failed(format!("token verification failed: {}", e)))?;

    check_timestamps(&token_data.claims, clock.now_secs())?;
    DecodedToken::new(&token_data.claims, &header.raw)
}

/// Same checks as [`check_token`] for the curves verified by aws-lc-rs
fn check_ecdsa_token(
    token: &str,
    header: &TokenHeader,
    key: &EcdsaPublicKey,
    issuer: &str,
    clock: &dyn Clock,
) -> Result<DecodedToken> {
    if header.alg != key.curve().algorithm() {
        return Err(ApiError::verification_failed(
            "token verification failed: InvalidAlgorithm",
        ));
    }

    let (signing_input, signature) = token
        .rsplit_once('.')
        .ok_or_else(|| ApiError::verification_failed("invalid JWT format"))?;
    key.verify(signing_input.as_bytes(), &base64_url_decode(signature)?)?;

    let (_, payload) = signing_input
        .split_once('.')
        .ok_or_else(|| ApiError::verification_failed("invalid JWT format"))?;
    let claims: Map<String, Value> = serde_json::from_slice(&base64_url_decode(payload)?)
        .map_err(|e| ApiError::verification_failed(format!("invalid JWT payload: {}", e)))?;

    check_issuer(&claims, issuer)?;
    check_timestamps(&claims, clock.now_secs())?;
    DecodedToken::new(&claims, &header.raw)
}

fn check_issuer(claims: &Map<String, Value>, issuer: &str) -> Result<()> {
    match claims.get("iss").and_then(Value::as_str) {
        None => Err(ApiError::verification_failed(
            "token verification failed: Missing required claim: iss",
        )),
        Some(found) if found != issuer => Err(ApiError::verification_failed(
            "token verification failed: InvalidIssuer",
        )),
        Some(_) => Ok(()),
    }
}

fn check_timestamps(claims: &Map<String, Value>, now_secs: u64) -> Result<()> {
    let now = now_secs as f64;

    if let Some(exp) = numeric_claim(claims, "exp")? {
        if exp <= now {
            return Err(ApiError::verification_failed("token has expired"));
        }
    }

    if let Some(nbf) = numeric_claim(claims, "nbf")? {
        if nbf > now {
            return Err(ApiError::verification_failed("token is not yet valid (nbf claim)"));
        }
    }

    Ok(())
}

fn numeric_claim(claims: &Map<String, Value>, name: &str) -> Result<Option<f64>> {
    match claims.get(name) {
        None => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| {
            ApiError::verification_failed(format!("\"{}\" claim must be a number", name))
        }),
    }
}

/// Base64 URL decode
fn base64_url_decode(input: &str) -> Result<Vec<u8>> {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    URL_SAFE_NO_PAD
        .decode(input)
        .or_else(|_| {
            use base64::engine::general_purpose::URL_SAFE;
            URL_SAFE.decode(input)
        })
        .map_err(|e| ApiError::verification_failed(format!("invalid base64: {}", e)))
}
