//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Tokens are loaded from GATEWAY_ACCESS_TOKEN / GATEWAY_REFRESH_TOKEN or
//! refresh_token_file, never stored in the TOML directly.

use common::Secret;
use gateway::EndpointPolicy;
use serde::Deserialize;
use session::TenantContext;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ACCESS_TOKEN_ENV: &str = "GATEWAY_ACCESS_TOKEN";
pub const REFRESH_TOKEN_ENV: &str = "GATEWAY_REFRESH_TOKEN";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub endpoints: EndpointPolicy,
    #[serde(default)]
    pub tenant: Option<TenantContext>,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Remote API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,
}

/// Initial credential
#[derive(Debug, Default, Deserialize)]
pub struct SessionConfig {
    /// Path to a file containing the refresh token (alternative to
    /// GATEWAY_REFRESH_TOKEN)
    #[serde(default)]
    pub refresh_token_file: Option<PathBuf>,
    #[serde(skip)]
    pub access_token: Option<Secret<String>>,
    #[serde(skip)]
    pub refresh_token: Option<Secret<String>>,
}

fn default_timeout() -> u64 {
    30
}

fn default_refresh_timeout() -> u64 {
    30
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    fn validate(&self) -> common::Result<()> {
        let scheme_ok = ["http://", "https://"]
            .iter()
            .any(|scheme| self.base_url.starts_with(scheme));
        if !scheme_ok {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }

        for (field, secs) in [
            ("timeout_secs", self.timeout_secs),
            ("refresh_timeout_secs", self.refresh_timeout_secs),
        ] {
            if secs == 0 {
                return Err(common::Error::Config(format!(
                    "{field} must be greater than 0"
                )));
            }
        }
        Ok(())
    }
}

impl SessionConfig {
    /// Overlay tokens from the environment; the refresh token falls back to
    /// `refresh_token_file`.
    fn resolve_tokens(&mut self) -> common::Result<()> {
        self.access_token = non_empty_env(ACCESS_TOKEN_ENV);
        self.refresh_token = match non_empty_env(REFRESH_TOKEN_ENV) {
            Some(token) => Some(token),
            None => self
                .refresh_token_file
                .as_deref()
                .map(read_token_file)
                .transpose()?
                .flatten(),
        };
        Ok(())
    }
}

/// Patterns are matched against request paths, so they must be absolute.
fn validate_endpoints(policy: &EndpointPolicy) -> common::Result<()> {
    let lists = [("public", &policy.public), ("tenant_exempt", &policy.tenant_exempt)];
    for (list, patterns) in lists {
        if let Some(bad) = patterns.iter().find(|p| !p.starts_with('/')) {
            return Err(common::Error::Config(format!(
                "endpoints.{list} entries must start with '/', got: {bad}"
            )));
        }
    }
    Ok(())
}

impl Config {
    /// Parse and validate a TOML file, then overlay tokens from the
    /// environment (see `SessionConfig::resolve_tokens`).
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.api.validate()?;
        validate_endpoints(&config.endpoints)?;
        config.session.resolve_tokens()?;
        Ok(config)
    }

    /// `--config`, else CONFIG_PATH, else `authgate.toml` in the working
    /// directory.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        cli_path
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("CONFIG_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("authgate.toml"))
    }
}

/// A whitespace-only file means no token.
fn read_token_file(path: &Path) -> common::Result<Option<Secret<String>>> {
    let token = std::fs::read_to_string(path).map_err(|e| {
        common::Error::Config(format!(
            "failed to read refresh_token_file {}: {e}",
            path.display()
        ))
    })?;
    let token = token.trim();
    Ok((!token.is_empty()).then(|| Secret::new(token.to_owned())))
}

fn non_empty_env(key: &str) -> Option<Secret<String>> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .map(Secret::new)
}
