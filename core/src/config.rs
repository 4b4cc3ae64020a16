//! Configuration and secrets management

use crate::error::{ApiError, Result};
use crate::oidc::algorithms::supported_algorithms;
use crate::platform::Environment;

/// Grant type used when `GRANT_TYPE` is not configured
pub const DEFAULT_GRANT_TYPE: &str = "client_credentials";

/// Signing algorithm used when `KEY_ALGORITHM` is not configured
pub const DEFAULT_KEY_ALGORITHM: &str = "RS256";

/// User-Agent sent with every outbound request
pub const USER_AGENT: &str = concat!("oidc-probe/", env!("CARGO_PKG_VERSION"));

/// Tool configuration, resolved once and passed to the pipeline explicitly
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Grant type literal sent to the token endpoint
    pub grant_type: String,
    /// Client id used by `TokenAcquirer::request_token`
    pub client_id: Option<String>,
    /// Client secret used by `TokenAcquirer::request_token`
    pub client_secret: Option<String>,
    /// Audience sent with every grant
    pub audience: String,
    /// Algorithm listed first by the catalog and used for local key files
    pub default_key_algorithm: String,
    /// Issuer access tokens are verified against; the flow issuer when unset
    pub token_issuer: Option<String>,
    /// Local PEM public key; tokens are verified against the issuer's JWKS when unset
    pub key_file: Option<String>,
    /// Report token-decode failures after acquisition as success
    pub legacy_acquisition_error_success: bool,
}

impl Config {
    /// Configuration with defaults for everything but the audience
    pub fn new(audience: impl Into<String>) -> Self {
        Self {
            grant_type: DEFAULT_GRANT_TYPE.to_string(),
            client_id: None,
            client_secret: None,
            audience: audience.into(),
            default_key_algorithm: DEFAULT_KEY_ALGORITHM.to_string(),
            token_issuer: None,
            key_file: None,
            legacy_acquisition_error_success: false,
        }
    }

    /// Load configuration from platform environment
    pub fn from_env(env: &dyn Environment) -> Result<Self> {
        let audience = optional(env.get_var("AUDIENCE"))
            .ok_or_else(|| ApiError::internal("AUDIENCE not configured"))?;

        let legacy_acquisition_error_success =
            match optional(env.get_var("LEGACY_ACQUISITION_ERROR_SUCCESS")) {
                Some(value) => parse_flag(&value).ok_or_else(|| {
                    ApiError::internal(format!(
                        "LEGACY_ACQUISITION_ERROR_SUCCESS must be a boolean, got '{}'",
                        value
                    ))
                })?,
                None => false,
            };

        Ok(Self {
            grant_type: optional(env.get_var("GRANT_TYPE"))
                .unwrap_or_else(|| DEFAULT_GRANT_TYPE.to_string()),
            client_id: optional(env.get_var("CLIENT_ID")),
            client_secret: optional(env.get_secret("CLIENT_SECRET")),
            audience,
            default_key_algorithm: key_algorithm(env),
            token_issuer: optional(env.get_var("ISSUER_STRING")),
            key_file: optional(env.get_var("KEY_MATERIAL_FILE")),
            legacy_acquisition_error_success,
        })
    }

    /// Supported signing algorithms with the configured default first
    pub fn key_algorithms(&self) -> Vec<String> {
        supported_algorithms(&self.default_key_algorithm)
    }
}

/// Default signing algorithm from `KEY_ALGORITHM`
///
/// Readable without an `AUDIENCE`, for commands that need nothing else.
pub fn key_algorithm(env: &dyn Environment) -> String {
    optional(env.get_var("KEY_ALGORITHM")).unwrap_or_else(|| DEFAULT_KEY_ALGORITHM.to_string())
}

/// Missing and empty values both count as unset
fn optional(value: Result<String>) -> Option<String> {
    value.ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
