//! Client-credentials token acquisition
//!
//! Posts a form encoded grant to a token endpoint. Every failure of the
//! exchange itself is reported as "Access denied", whatever the cause.

use serde_json::Value;
use tracing::{debug, info};

use crate::config::{Config, USER_AGENT};
use crate::error::{ApiError, Result};
use crate::oidc::resolve_issuer;
use crate::platform::HttpClient;

/// Content type of a grant request body
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Grant parameters sent to the token endpoint
#[derive(Clone, PartialEq)]
pub struct GrantRequest {
    pub grant_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub audience: String,
}

impl std::fmt::Debug for GrantRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantRequest")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("audience", &self.audience)
            .finish()
    }
}

impl GrantRequest {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("grant_type", &self.grant_type),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("audience", &self.audience),
        ] {
            if value.is_empty() {
                return Err(ApiError::invalid_argument(format!(
                    "No or Empty {} has been received",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Form encoded request body
    pub fn to_form_body(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", &self.grant_type)
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("audience", &self.audience)
            .finish()
    }
}

/// Raw token endpoint response; nothing beyond its presence is validated
#[derive(Debug, Clone, PartialEq)]
pub struct TokenResponse {
    raw: Value,
}

impl TokenResponse {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.raw.get("access_token").and_then(Value::as_str)
    }

    pub fn token_type(&self) -> Option<&str> {
        self.raw.get("token_type").and_then(Value::as_str)
    }

    pub fn expires_in(&self) -> Option<u64> {
        self.raw.get("expires_in").and_then(Value::as_u64)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Performs grant exchanges with the configured grant type and audience
pub struct TokenAcquirer<'a> {
    config: &'a Config,
    http: &'a dyn HttpClient,
}

impl<'a> TokenAcquirer<'a> {
    pub fn new(config: &'a Config, http: &'a dyn HttpClient) -> Self {
        Self { config, http }
    }

    /// Grant for the given client, using the configured grant type and audience
    pub fn grant_for(&self, client_id: &str, client_secret: &str) -> GrantRequest {
        GrantRequest {
            grant_type: self.config.grant_type.clone(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            audience: self.config.audience.clone(),
        }
    }

    /// Exchange `grant` at `token_endpoint`, once
    pub async fn acquire(&self, token_endpoint: &str, grant: &GrantRequest) -> Result<TokenResponse> {
        if token_endpoint.is_empty() || url::Url::parse(token_endpoint).is_err() {
            return Err(ApiError::invalid_argument(
                "No or Empty token endpoint has been received",
            ));
        }
        grant.validate()?;

        debug!(url = %token_endpoint, client_id = %grant.client_id, "requesting token");

        let body = grant.to_form_body();
        let response = self
            .http
            .post(
                token_endpoint,
                &[
                    ("Content-Type", FORM_CONTENT_TYPE),
                    ("Accept", "application/json"),
                    ("User-Agent", USER_AGENT),
                ],
                body.as_bytes(),
            )
            .await
            .map_err(|e| {
                debug!(error = %e, "token request failed");
                access_denied()
            })?;

        if !response.is_success() {
            debug!(status = response.status, "token endpoint rejected the grant");
            return Err(access_denied());
        }

        let raw = response.json::<Value>().unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&response.body).into_owned())
        });

        info!(url = %token_endpoint, "token endpoint accepted the grant");
        Ok(TokenResponse::new(raw))
    }

    /// Resolve `issuer` and exchange the configured client credentials
    pub async fn request_token(&self, issuer: &str) -> Result<TokenResponse> {
        if issuer.trim().is_empty() {
            return Err(ApiError::invalid_argument(
                "There was no issuer string passed to get the issuer",
            ));
        }

        let client_id = self
            .config
            .client_id
            .as_deref()
            .ok_or_else(|| ApiError::invalid_argument("no client id configured"))?;
        let client_secret = self
            .config
            .client_secret
            .as_deref()
            .ok_or_else(|| ApiError::invalid_argument("no client secret configured"))?;

        let metadata = resolve_issuer(issuer, self.http)
            .await
            .map_err(|e| ApiError::discovery_failed(format!("invalid issuer: {}", e)))?;

        let grant = self.grant_for(client_id, client_secret);
        self.acquire(metadata.token_endpoint()?, &grant).await
    }
}

fn access_denied() -> ApiError {
    ApiError::unauthorized("Access denied")
}
