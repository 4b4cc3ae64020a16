//! Issuer metadata field selection
//!
//! The discovery document shape is fixed, so display selection works on an
//! explicit whitelist of field names instead of arbitrary keys.

use serde_json::{Map, Value};

use super::discovery::IssuerMetadata;
use crate::error::{ApiError, Result};

/// A known discovery metadata field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
    AuthorizationEndpoint,
    ClaimTypesSupported,
    ClaimsParameterSupported,
    ClaimsSupported,
    CodeChallengeMethodsSupported,
    DeviceAuthorizationEndpoint,
    GrantTypesSupported,
    IdTokenSigningAlgValuesSupported,
    Issuer,
    JwksUri,
    RequestParameterSupported,
    RequestUriParameterSupported,
    RequireRequestUriRegistration,
    ResponseModesSupported,
    ResponseTypesSupported,
    RevocationEndpoint,
    RevocationEndpointAuthMethodsSupported,
    ScopesSupported,
    SubjectTypesSupported,
    TokenEndpoint,
    TokenEndpointAuthMethodsSupported,
    UserinfoEndpoint,
}

impl MetadataField {
    pub const ALL: [MetadataField; 22] = [
        Self::AuthorizationEndpoint,
        Self::ClaimTypesSupported,
        Self::ClaimsParameterSupported,
        Self::ClaimsSupported,
        Self::CodeChallengeMethodsSupported,
        Self::DeviceAuthorizationEndpoint,
        Self::GrantTypesSupported,
        Self::IdTokenSigningAlgValuesSupported,
        Self::Issuer,
        Self::JwksUri,
        Self::RequestParameterSupported,
        Self::RequestUriParameterSupported,
        Self::RequireRequestUriRegistration,
        Self::ResponseModesSupported,
        Self::ResponseTypesSupported,
        Self::RevocationEndpoint,
        Self::RevocationEndpointAuthMethodsSupported,
        Self::ScopesSupported,
        Self::SubjectTypesSupported,
        Self::TokenEndpoint,
        Self::TokenEndpointAuthMethodsSupported,
        Self::UserinfoEndpoint,
    ];

    /// Field name as it appears in the discovery document
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationEndpoint => "authorization_endpoint",
            Self::ClaimTypesSupported => "claim_types_supported",
            Self::ClaimsParameterSupported => "claims_parameter_supported",
            Self::ClaimsSupported => "claims_supported",
            Self::CodeChallengeMethodsSupported => "code_challenge_methods_supported",
            Self::DeviceAuthorizationEndpoint => "device_authorization_endpoint",
            Self::GrantTypesSupported => "grant_types_supported",
            Self::IdTokenSigningAlgValuesSupported => "id_token_signing_alg_values_supported",
            Self::Issuer => "issuer",
            Self::JwksUri => "jwks_uri",
            Self::RequestParameterSupported => "request_parameter_supported",
            Self::RequestUriParameterSupported => "request_uri_parameter_supported",
            Self::RequireRequestUriRegistration => "require_request_uri_registration",
            Self::ResponseModesSupported => "response_modes_supported",
            Self::ResponseTypesSupported => "response_types_supported",
            Self::RevocationEndpoint => "revocation_endpoint",
            Self::RevocationEndpointAuthMethodsSupported => {
                "revocation_endpoint_auth_methods_supported"
            }
            Self::ScopesSupported => "scopes_supported",
            Self::SubjectTypesSupported => "subject_types_supported",
            Self::TokenEndpoint => "token_endpoint",
            Self::TokenEndpointAuthMethodsSupported => "token_endpoint_auth_methods_supported",
            Self::UserinfoEndpoint => "userinfo_endpoint",
        }
    }

    /// Look up a field by its document name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.as_str() == name)
    }
}

impl std::fmt::Display for MetadataField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetadataField {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
            .ok_or_else(|| ApiError::invalid_argument(format!("unknown metadata field '{}'", s)))
    }
}

/// Turn requested names into a field selection
///
/// Unknown names are skipped and repeats keep their first position.
pub fn select_fields<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<MetadataField> {
    let mut selected = Vec::new();
    for field in names.into_iter().filter_map(MetadataField::from_name) {
        if !selected.contains(&field) {
            selected.push(field);
        }
    }
    selected
}

impl IssuerMetadata {
    /// Value of a single field, if the document published it
    pub fn field(&self, field: MetadataField) -> Option<Value> {
        fn text(value: &Option<String>) -> Option<Value> {
            value.as_ref().map(|v| Value::String(v.clone()))
        }
        fn list(value: &Option<Vec<String>>) -> Option<Value> {
            value
                .as_ref()
                .map(|v| Value::Array(v.iter().cloned().map(Value::String).collect()))
        }
        fn flag(value: &Option<bool>) -> Option<Value> {
            value.map(Value::Bool)
        }

        match field {
            MetadataField::AuthorizationEndpoint => text(&self.authorization_endpoint),
            MetadataField::ClaimTypesSupported => list(&self.claim_types_supported),
            MetadataField::ClaimsParameterSupported => flag(&self.claims_parameter_supported),
            MetadataField::ClaimsSupported => list(&self.claims_supported),
            MetadataField::CodeChallengeMethodsSupported => {
                list(&self.code_challenge_methods_supported)
            }
            MetadataField::DeviceAuthorizationEndpoint => text(&self.device_authorization_endpoint),
            MetadataField::GrantTypesSupported => list(&self.grant_types_supported),
            MetadataField::IdTokenSigningAlgValuesSupported => {
                list(&self.id_token_signing_alg_values_supported)
            }
            MetadataField::Issuer => text(&self.issuer),
            MetadataField::JwksUri => text(&self.jwks_uri),
            MetadataField::RequestParameterSupported => flag(&self.request_parameter_supported),
            MetadataField::RequestUriParameterSupported => {
                flag(&self.request_uri_parameter_supported)
            }
            MetadataField::RequireRequestUriRegistration => {
                flag(&self.require_request_uri_registration)
            }
            MetadataField::ResponseModesSupported => list(&self.response_modes_supported),
            MetadataField::ResponseTypesSupported => list(&self.response_types_supported),
            MetadataField::RevocationEndpoint => text(&self.revocation_endpoint),
            MetadataField::RevocationEndpointAuthMethodsSupported => {
                list(&self.revocation_endpoint_auth_methods_supported)
            }
            MetadataField::ScopesSupported => list(&self.scopes_supported),
            MetadataField::SubjectTypesSupported => list(&self.subject_types_supported),
            MetadataField::TokenEndpoint => text(&self.token_endpoint),
            MetadataField::TokenEndpointAuthMethodsSupported => {
                list(&self.token_endpoint_auth_methods_supported)
            }
            MetadataField::UserinfoEndpoint => text(&self.userinfo_endpoint),
        }
    }

    /// Project the document onto `fields`, in selection order
    ///
    /// Fields the document does not publish are left out.
    pub fn project(&self, fields: &[MetadataField]) -> Map<String, Value> {
        fields
            .iter()
            .filter_map(|field| self.field(*field).map(|value| (field.as_str().to_string(), value)))
            .collect()
    }

    /// Projection rendered as 2-space indented JSON
    pub fn project_pretty(&self, fields: &[MetadataField]) -> Result<String> {
        serde_json::to_string_pretty(&self.project(fields))
            .map_err(|e| ApiError::internal(format!("failed to render metadata: {}", e)))
    }
}
