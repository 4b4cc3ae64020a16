//! OIDC Discovery document fetching
//!
//! Fetches and parses OpenID Connect discovery documents.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::USER_AGENT;
use crate::error::{ApiError, Result};
use crate::platform::HttpClient;

/// Well-known path appended to an issuer URL
pub const OPENID_CONFIGURATION_PATH: &str = "/.well-known/openid-configuration";

/// OIDC Discovery document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssuerMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_authorization_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant_types_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_types_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modes_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token_signing_alg_values_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_types_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_types_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_methods_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_methods_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_endpoint_auth_methods_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims_parameter_supported: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_parameter_supported: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_uri_parameter_supported: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_request_uri_registration: Option<bool>,
}

impl IssuerMetadata {
    /// Token endpoint of a validated document
    pub fn token_endpoint(&self) -> Result<&str> {
        self.token_endpoint
            .as_deref()
            .ok_or_else(|| ApiError::discovery_failed("discovery document is missing token_endpoint"))
    }

    /// Key set URI, required for remote key set verification
    pub fn jwks_uri(&self) -> Result<&str> {
        self.jwks_uri
            .as_deref()
            .ok_or_else(|| ApiError::discovery_failed("discovery document is missing jwks_uri"))
    }

    /// Check the fields every downstream stage relies on
    fn validate(&self) -> Result<()> {
        for (name, value) in [("issuer", &self.issuer), ("token_endpoint", &self.token_endpoint)] {
            let value = value.as_deref().ok_or_else(|| {
                ApiError::discovery_failed(format!("discovery document is missing {}", name))
            })?;

            url::Url::parse(value).map_err(|e| {
                ApiError::discovery_failed(format!("discovery document has malformed {}: {}", name, e))
            })?;
        }

        Ok(())
    }
}

/// Fetch and validate the discovery document for an issuer
pub async fn resolve_issuer(issuer_url: &str, http: &dyn HttpClient) -> Result<IssuerMetadata> {
    if issuer_url.trim().is_empty() {
        return Err(ApiError::invalid_argument(
            "There was no issuer string passed to get the issuer",
        ));
    }

    let discovery_url = discovery_url(issuer_url)?;
    debug!(url = %discovery_url, "fetching discovery document");

    let response = http
        .get(
            &discovery_url,
            &[("Accept", "application/json"), ("User-Agent", USER_AGENT)],
        )
        .await
        .map_err(|e| ApiError::discovery_failed(format!("failed to fetch discovery document: {}", e)))?;

    if !response.is_success() {
        return Err(ApiError::discovery_failed(format!(
            "failed to fetch discovery document: HTTP {}",
            response.status
        )));
    }

    let metadata: IssuerMetadata = response
        .json()
        .map_err(|e| ApiError::discovery_failed(format!("invalid discovery document: {}", e)))?;

    metadata.validate()?;

    if let Some(issuer) = metadata.issuer.as_deref() {
        if !issuer_matches(issuer, issuer_url) {
            warn!(
                requested = %issuer_url,
                published = %issuer,
                "discovery document issuer does not match the requested issuer"
            );
        }
    }

    info!(issuer = %issuer_url, "resolved issuer metadata");
    Ok(metadata)
}

/// Compare a published issuer with the requested one
///
/// A requested well-known URL is compared by the part before `/.well-known/`.
/// Trailing slashes on either side are ignored.
fn issuer_matches(published: &str, requested: &str) -> bool {
    let requested = match requested.find("/.well-known/") {
        Some(index) => &requested[..index],
        None => requested,
    };
    published.trim_end_matches('/') == requested.trim_end_matches('/')
}

/// Build the discovery URL, keeping explicit well-known URLs untouched
fn discovery_url(issuer_url: &str) -> Result<String> {
    let url = url::Url::parse(issuer_url)
        .map_err(|e| ApiError::discovery_failed(format!("invalid issuer URL '{}': {}", issuer_url, e)))?;

    if url.path().contains("/.well-known/") {
        return Ok(issuer_url.to_string());
    }

    Ok(format!(
        "{}{}",
        issuer_url.trim_end_matches('/'),
        OPENID_CONFIGURATION_PATH
    ))
}
