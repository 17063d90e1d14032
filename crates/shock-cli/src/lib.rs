//! Shared plumbing for the Shock command-line tools: connection flags,
//! tracing setup, JSON output and exit codes.

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use shock_api_client::ApiClient;
use shock_core::{ShockConfig, ShockError, TransportPreference};

/// Exit code for a rejected token.
pub const EXIT_UNAUTHORIZED: i32 = 401;
/// Exit code for a missing or unknown location or node.
pub const EXIT_NOT_FOUND: i32 = 404;
/// Exit code for usage errors and every other failure.
pub const EXIT_FAILURE: i32 = 1;

/// Flags every tool accepts for reaching the service.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Shock base URL (falls back to SHOCK_URL, then SHOCK_HOST/SHOCK_PORT)
    #[arg(long = "shock-host", value_name = "URL")]
    pub shock_host: Option<String>,

    /// Auth token, optionally prefixed by its scheme (falls back to SHOCK_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Transport for uploads and downloads: auto, http or external (falls back to SHOCK_TRANSPORT)
    #[arg(long)]
    pub transport: Option<TransportPreference>,

    /// Log at debug level
    #[arg(long)]
    pub debug: bool,
}

impl ConnectionArgs {
    /// Environment configuration with these flags applied on top.
    pub fn config(&self) -> anyhow::Result<ShockConfig> {
        let mut config = ShockConfig::from_env()
            .context("Failed to read Shock configuration")?
            .with_base_url(self.shock_host.as_deref())
            .with_token(self.token.as_deref());
        if let Some(transport) = self.transport {
            config = config.with_transport(transport);
        }
        config.validate()?;
        if config.auth.is_none() {
            tracing::warn!("No auth token, requests are sent anonymously");
        }
        Ok(config)
    }

    /// Build a client and register the token with its transport.
    pub async fn client(&self) -> anyhow::Result<ApiClient> {
        let config = self.config()?;
        Ok(ApiClient::connect(&config).await?)
    }
}

/// Initialize tracing for CLI binaries. Logs go to stderr; stdout carries
/// program output.
pub fn init_tracing(debug: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(debug))
        .with_writer(std::io::stderr)
        .init();
}

fn env_filter(debug: bool) -> tracing_subscriber::EnvFilter {
    if debug {
        return tracing_subscriber::EnvFilter::new("debug");
    }
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Parse arguments; usage errors exit with status 1, help and version with 0.
pub fn parse_args<T: Parser>() -> T {
    dotenvy::dotenv().ok();
    match T::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_FAILURE } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    }
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Process exit code for an error that ended a tool.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ShockError>() {
        Some(ShockError::Auth(_)) => EXIT_UNAUTHORIZED,
        Some(ShockError::NotFound(_)) => EXIT_NOT_FOUND,
        _ => EXIT_FAILURE,
    }
}

/// Report a failed run on stderr and exit with the matching code.
pub fn exit_with(err: anyhow::Error) -> ! {
    let code = exit_code(&err);
    match code {
        EXIT_UNAUTHORIZED => {
            eprintln!("Error 401\tcheck token passed on command line or in SHOCK_TOKEN")
        }
        _ => eprintln!("Error: {:#}", err),
    }
    std::process::exit(code);
}

/// Split a `key=value` query filter.
pub fn parse_filter(raw: &str) -> anyhow::Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(anyhow::anyhow!("Invalid filter '{}', expected key=value", raw)),
    }
}
