use anyhow::{Context, Result};

/// Marker substring that disables backend-as-a-service integration.
/// A deployment URL containing it means "not configured yet" rather than
/// a fatal misconfiguration.
const PLACEHOLDER_MARKER: &str = "placeholder";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity provider API key (the web API key of the project).
    pub identity_api_key: String,
    pub identity_project_id: String,
    /// Backend-as-a-service deployment URL. `None` or a placeholder value
    /// puts the service in degraded mode: sessions work, record sync is
    /// skipped.
    pub record_store_url: Option<String>,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// One-time bootstrap credential injected by a hosting environment
    /// (SSO integration). Used once at startup, never persisted.
    pub initial_auth_token: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            identity_api_key: require_env("IDENTITY_API_KEY")?,
            identity_project_id: require_env("IDENTITY_PROJECT_ID")?,
            record_store_url: std::env::var("RECORD_STORE_URL").ok(),
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            initial_auth_token: std::env::var("DRIVEHOUSE_INITIAL_AUTH_TOKEN").ok(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Whether the backend-as-a-service deployment is actually reachable
    /// configuration-wise. A missing or placeholder URL means record sync
    /// is skipped entirely (degraded mode, not a failure).
    pub fn record_store_configured(&self) -> bool {
        match &self.record_store_url {
            Some(url) => !url.is_empty() && !url.contains(PLACEHOLDER_MARKER),
            None => false,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
