//! oidc-probe: OIDC conformance checks from the command line
//!
//! Thin adapter over oidc-probe-core. Reports are printed as JSON on stdout,
//! diagnostics go to stderr.
//! Uses single-threaded tokio runtime (compatible with core's !Send async traits).

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, warn};

use oidc_probe_core::config::{key_algorithm, Config};
use oidc_probe_core::error::{ApiError, ErrorResponse, Result};
use oidc_probe_core::flows::ClientCredentialsFlow;
use oidc_probe_core::oidc::{
    resolve_issuer, select_fields, supported_algorithms, verify, MetadataField,
    VerificationRequest,
};
use oidc_probe_core::token::TokenAcquirer;

mod logging;
mod platform;

use platform::{ProcessEnv, ReqwestHttpClient, SystemClock, TokioFileSystem};

/// OIDC provider conformance checker
#[derive(Parser, Debug)]
#[command(name = "oidc-probe")]
#[command(version)]
#[command(about = "Checks an OpenID Connect provider's discovery, token and signing behavior", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long = "log-level", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve an issuer and print its discovery metadata
    Discover {
        /// Issuer URL or explicit discovery document URL
        issuer: String,

        /// Metadata field to print (repeatable, all fields when omitted)
        #[arg(long = "field")]
        fields: Vec<String>,
    },

    /// Print the supported signing algorithms, default first
    Algorithms,

    /// Request a token with the configured client credentials
    Token {
        /// Issuer URL
        issuer: String,
    },

    /// Verify a token and print its payload and header
    Verify {
        /// Issuer the token must have been issued by
        #[arg(long)]
        issuer: String,

        /// Compact JWT
        #[arg(long, env = "OIDC_PROBE_TOKEN", hide_env_values = true)]
        token: String,

        /// PEM public key to verify with instead of the issuer's key set
        #[arg(long = "key-file")]
        key_file: Option<String>,

        /// Algorithm accepted with --key-file (defaults to KEY_ALGORITHM)
        #[arg(long, requires = "key_file")]
        algorithm: Option<String>,
    },

    /// Run the client-credentials flow end to end
    Flow {
        /// Issuer URL
        issuer: String,

        #[arg(long = "client-id")]
        client_id: String,

        #[arg(long = "client-secret", env = "OIDC_PROBE_CLIENT_SECRET", hide_env_values = true)]
        client_secret: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(&cli.log_level) {
        eprintln!("oidc-probe: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, status = e.status_code(), "command failed");
            print_json(&ErrorResponse::from(&e));
            ExitCode::FAILURE
        }
    }
}

/// Execute a command; `Ok(false)` reports a completed but unsuccessful check
async fn run(command: Command) -> Result<bool> {
    let http = ReqwestHttpClient::new();
    let files = TokioFileSystem;
    let clock = SystemClock;
    let env = ProcessEnv;

    match command {
        Command::Discover { issuer, fields } => {
            let metadata = resolve_issuer(&issuer, &http).await?;

            let selected = if fields.is_empty() {
                MetadataField::ALL.to_vec()
            } else {
                for name in &fields {
                    if MetadataField::from_name(name).is_none() {
                        warn!(field = %name, "ignoring unknown metadata field");
                    }
                }
                select_fields(fields.iter().map(String::as_str))
            };

            println!("{}", metadata.project_pretty(&selected)?);
            Ok(true)
        }

        Command::Algorithms => {
            let default_algorithm = key_algorithm(&env);
            print_json(&supported_algorithms(&default_algorithm));
            Ok(true)
        }

        Command::Token { issuer } => {
            let config = Config::from_env(&env)?;
            let response = TokenAcquirer::new(&config, &http)
                .request_token(&issuer)
                .await?;
            print_json(response.raw());
            Ok(true)
        }

        Command::Verify {
            issuer,
            token,
            key_file,
            algorithm,
        } => {
            let request = match key_file {
                Some(path) => {
                    let algorithm = algorithm.unwrap_or_else(|| key_algorithm(&env));
                    VerificationRequest::local(issuer, token, algorithm, path)
                }
                None => VerificationRequest::remote(issuer, token),
            };

            let decoded = verify(&request, &http, &files, &clock).await?;
            print_json(&VerifyReport {
                payload: decoded.payload,
                header: decoded.header,
            });
            Ok(true)
        }

        Command::Flow {
            issuer,
            client_id,
            client_secret,
        } => {
            let config = Config::from_env(&env)?;
            let result = ClientCredentialsFlow::new(&config, &http, &files, &clock)
                .run(&issuer, &client_id, &client_secret)
                .await;
            print_json(&result);
            Ok(result.success)
        }
    }
}

#[derive(Serialize)]
struct VerifyReport {
    payload: String,
    header: String,
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{}", rendered),
        Err(e) => {
            let err = ApiError::internal(format!("failed to render output: {}", e));
            eprintln!("oidc-probe: {}", err);
        }
    }
}
