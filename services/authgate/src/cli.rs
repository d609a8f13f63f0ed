//! Command-line arguments

use clap::Parser;
use gateway::RequestDescriptor;
use reqwest::Method;

/// Execute one request through the authorization gateway.
#[derive(Parser, Debug)]
#[command(name = "authgate")]
#[command(about = "Send one authorized request and print the result as JSON")]
pub struct Cli {
    /// Config file (falls back to CONFIG_PATH, then authgate.toml)
    #[arg(long)]
    pub config: Option<String>,

    /// JSON request body
    #[arg(long, value_parser = parse_json)]
    pub body: Option<serde_json::Value>,

    /// Send without a credential, whatever the endpoint policy says
    #[arg(long)]
    pub public: bool,

    /// Send without tenant headers
    #[arg(long)]
    pub skip_tenant: bool,

    /// HTTP method (case-insensitive)
    #[arg(value_parser = parse_method)]
    pub method: Method,

    /// Request path relative to the API base URL, e.g. /jobs
    #[arg(value_parser = parse_path)]
    pub path: String,
}

fn parse_json(raw: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("not valid JSON: {e}"))
}

fn parse_method(raw: &str) -> Result<Method, String> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|_| format!("invalid HTTP method: {raw}"))
}

fn parse_path(raw: &str) -> Result<String, String> {
    if raw.starts_with('/') {
        Ok(raw.to_string())
    } else {
        Err(format!("must start with '/', got: {raw}"))
    }
}

impl Cli {
    /// The request this invocation describes.
    pub fn descriptor(&self) -> RequestDescriptor {
        let mut descriptor = RequestDescriptor::new(self.method.clone(), self.path.clone());
        if let Some(body) = &self.body {
            descriptor = descriptor.json(body.clone());
        }
        if self.public {
            descriptor = descriptor.public();
        }
        if self.skip_tenant {
            descriptor = descriptor.skip_tenant();
        }
        descriptor
    }
}
