//! Logging setup
//!
//! Diagnostics go to stderr through tracing-subscriber so stdout only ever
//! carries the JSON report.

use tracing_subscriber::EnvFilter;

/// Dependencies that log too much at debug level
const NOISY_TARGETS: &[(&str, &str)] = &[
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("reqwest", "warn"),
    ("rustls", "warn"),
];

/// Build the filter from `RUST_LOG` when set, otherwise from `level`
pub fn build_env_filter(level: &str) -> Result<EnvFilter, String> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec![level.to_string()];
    for (target, lvl) in NOISY_TARGETS {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| format!("invalid log filter '{}': {}", filter_str, e))
}

/// Install the global subscriber writing compact lines to stderr
pub fn init_logging(level: &str) -> Result<(), String> {
    let filter = build_env_filter(level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init()
        .map_err(|e| format!("failed to install logger: {}", e))
}
