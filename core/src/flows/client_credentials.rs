//! Client-credentials conformance flow
//!
//! Resolves an issuer, obtains a token with the supplied client credentials
//! and verifies the token that came back. Stages run strictly in order and
//! the first failure ends the flow.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::oidc::{
    resolve_issuer, verify, verify_with_metadata, DecodedToken, TokenHeader, VerificationRequest,
};
use crate::platform::{Clock, FileSystem, HttpClient};
use crate::token::TokenAcquirer;

const SUCCESS_MESSAGE: &str = "The access token was issued and its signature is valid";
const UNEXPECTED_VALIDATION_FAILURE: &str = "An unexpected failure happened during validation!";

/// Stage of the flow an outcome was decided in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    Input,
    Discovery,
    Acquisition,
    TokenDecode,
    Verification,
}

/// Outcome of a flow execution
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    Verified { token: DecodedToken },
    Failed { stage: FlowStage, error: ApiError },
}

impl FlowOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }
}

/// Serializable flow report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<FlowStage>,
}

impl FlowResult {
    /// Map an outcome to a report
    ///
    /// With `legacy_decode_success` a failure to read the issued token is
    /// still reported as a success.
    pub fn from_outcome(outcome: FlowOutcome, legacy_decode_success: bool) -> Self {
        match outcome {
            FlowOutcome::Verified { token } => Self {
                success: true,
                message: SUCCESS_MESSAGE.to_string(),
                payload: Some(token.payload),
                header: Some(token.header),
                error: None,
                stage: None,
            },
            FlowOutcome::Failed { stage, error } => {
                let (success, message) = match stage {
                    FlowStage::TokenDecode => {
                        (legacy_decode_success, format!("An error occurred: {}", error))
                    }
                    FlowStage::Verification if !error.is_classified() => {
                        (false, UNEXPECTED_VALIDATION_FAILURE.to_string())
                    }
                    _ => (false, error.to_string()),
                };
                Self {
                    success,
                    message,
                    payload: None,
                    header: None,
                    error: Some(error.error_key().to_string()),
                    stage: Some(stage),
                }
            }
        }
    }
}

/// Runs the client-credentials flow against one issuer
pub struct ClientCredentialsFlow<'a> {
    config: &'a Config,
    http: &'a dyn HttpClient,
    files: &'a dyn FileSystem,
    clock: &'a dyn Clock,
}

impl<'a> ClientCredentialsFlow<'a> {
    pub fn new(
        config: &'a Config,
        http: &'a dyn HttpClient,
        files: &'a dyn FileSystem,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            config,
            http,
            files,
            clock,
        }
    }

    /// Run the flow and report the result; never fails
    pub async fn run(&self, issuer: &str, client_id: &str, client_secret: &str) -> FlowResult {
        let outcome = self.execute(issuer, client_id, client_secret).await;
        FlowResult::from_outcome(outcome, self.config.legacy_acquisition_error_success)
    }

    /// Run the flow and return its outcome
    pub async fn execute(&self, issuer: &str, client_id: &str, client_secret: &str) -> FlowOutcome {
        match self.try_execute(issuer, client_id, client_secret).await {
            Ok(token) => {
                info!(issuer = %issuer, "client credentials flow verified");
                FlowOutcome::Verified { token }
            }
            Err((stage, error)) => {
                warn!(issuer = %issuer, stage = ?stage, error = %error, "client credentials flow failed");
                FlowOutcome::Failed { stage, error }
            }
        }
    }

    async fn try_execute(
        &self,
        issuer: &str,
        client_id: &str,
        client_secret: &str,
    ) -> std::result::Result<DecodedToken, (FlowStage, ApiError)> {
        check_input(issuer, client_id, client_secret).map_err(at(FlowStage::Input))?;

        let metadata = resolve_issuer(issuer, self.http)
            .await
            .map_err(at(FlowStage::Discovery))?;
        let token_endpoint = metadata.token_endpoint().map_err(at(FlowStage::Discovery))?;

        let acquirer = TokenAcquirer::new(self.config, self.http);
        let grant = acquirer.grant_for(client_id, client_secret);
        let response = acquirer
            .acquire(token_endpoint, &grant)
            .await
            .map_err(at(FlowStage::Acquisition))?;

        let access_token = response
            .access_token()
            .ok_or_else(|| ApiError::verification_failed("token response has no access_token"))
            .map_err(at(FlowStage::TokenDecode))?;
        TokenHeader::parse(access_token).map_err(at(FlowStage::TokenDecode))?;

        let verify_issuer = self.config.token_issuer.as_deref().unwrap_or(issuer);
        let request = match &self.config.key_file {
            Some(path) => VerificationRequest::local(
                verify_issuer,
                access_token,
                self.config.default_key_algorithm.as_str(),
                path.as_str(),
            ),
            None => VerificationRequest::remote(verify_issuer, access_token),
        };
        debug!(issuer = %verify_issuer, trust = ?request.trust, "verifying issued token");

        let verified = if verify_issuer == issuer {
            verify_with_metadata(&request, &metadata, self.http, self.files, self.clock).await
        } else {
            verify(&request, self.http, self.files, self.clock).await
        };
        verified.map_err(at(FlowStage::Verification))
    }
}

fn check_input(issuer: &str, client_id: &str, client_secret: &str) -> Result<()> {
    if issuer.trim().is_empty() {
        return Err(ApiError::invalid_argument(
            "There was no issuer to validate the token against!",
        ));
    }
    if client_id.is_empty() {
        return Err(ApiError::unauthorized("There was no client id provided"));
    }
    if client_secret.is_empty() {
        return Err(ApiError::unauthorized("There was no client secret provided"));
    }
    Ok(())
}

fn at(stage: FlowStage) -> impl Fn(ApiError) -> (FlowStage, ApiError) {
    move |error| (stage, error)
}
