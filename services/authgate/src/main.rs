//! authgate
//!
//! Runs one request through the authorization gateway:
//! 1. Loads the API base URL, endpoint policy, tenant and seed credential
//! 2. Attaches bearer credential and tenant headers
//! 3. Refreshes the credential once on a 401 and retries
//! 4. Prints the response body, or the normalized error, as JSON

mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use gateway::{Gateway, GatewayConfig, NormalizedError, Response, SessionEvent};
use session::{Credential, CredentialStore, TenantContextProvider};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::HttpTransport;

use crate::cli::Cli;
use crate::config::{Config, SessionConfig};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // JSON logs on stderr with LOG_LEVEL / RUST_LOG support; stdout carries
    // the result.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.api.base_url,
        timeout_secs = config.api.timeout_secs,
        tenant = config.tenant.as_ref().map(|t| t.slug.as_str()),
        "configuration loaded"
    );

    let client = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let transport = HttpTransport::new(client, &config.api.base_url, config.api.timeout());

    let gateway = Gateway::new(
        Arc::new(transport),
        Arc::new(CredentialStore::new()),
        Arc::new(TenantContextProvider::new()),
        GatewayConfig {
            policy: config.endpoints,
            refresh_timeout: config.api.refresh_timeout(),
            ..GatewayConfig::default()
        },
    );

    match seed_credential(&config.session) {
        Some(credential) => gateway.establish_session(credential, config.tenant),
        None => {
            warn!("no credential configured, protected endpoints will be rejected");
            if let Some(tenant) = config.tenant {
                gateway.tenant().set(tenant);
            }
        }
    }

    let mut events = gateway.subscribe();
    let result = gateway.execute(cli.descriptor()).await;

    while let Ok(SessionEvent::LoggedOut { reason }) = events.try_recv() {
        warn!(%reason, "session ended, log in again to obtain a new credential");
    }

    let (output, code) = render(result);
    println!("{output}");
    Ok(code)
}

/// Initial credential from configuration.
///
/// A refresh token alone is enough: the empty access token is rejected on
/// the first protected call, which triggers a refresh. An access token alone
/// works until it is rejected; with no refresh token the session then ends.
fn seed_credential(session: &SessionConfig) -> Option<Credential> {
    let access = session.access_token.as_ref().map(|t| t.expose_str());
    let refresh = session.refresh_token.as_ref().map(|t| t.expose_str());
    if access.is_none() && refresh.is_none() {
        return None;
    }
    Some(Credential::new(
        access.unwrap_or_default(),
        refresh.unwrap_or_default(),
        0,
    ))
}

fn render(result: Result<Response, NormalizedError>) -> (String, ExitCode) {
    match result {
        Ok(response) => {
            let output = match serde_json::from_str::<serde_json::Value>(&response.body) {
                Ok(value) => serde_json::to_string_pretty(&value).unwrap_or(response.body),
                Err(_) => response.body,
            };
            (output, ExitCode::SUCCESS)
        }
        Err(e) => {
            let output = serde_json::to_string_pretty(&e).unwrap_or_else(|_| e.to_string());
            (output, ExitCode::FAILURE)
        }
    }
}
