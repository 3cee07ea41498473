use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

const DEFAULT_WEATHER_API_URL: &str = "https://api.weatherapi.com/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub jwt_secret: String,
    pub manager_pin: Option<String>,
    pub weather_api_url: String,
    pub weather_api_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("GREENWATCH_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("GREENWATCH_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let port = match var("GREENWATCH_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("GREENWATCH_PORT is not a port number: '{}'", raw))?,
            None => 3000,
        };

        Ok(Self {
            host: var("GREENWATCH_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("GREENWATCH_DB_PATH").unwrap_or_else(|| "greenwatch.db".into()).into(),
            upload_dir: var("GREENWATCH_UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into(),
            jwt_secret,
            manager_pin: var("GREENWATCH_MANAGER_PIN").filter(|p| !p.trim().is_empty()),
            weather_api_url: var("GREENWATCH_WEATHER_API_URL")
                .unwrap_or_else(|| DEFAULT_WEATHER_API_URL.into()),
            weather_api_key: var("GREENWATCH_WEATHER_API_KEY").unwrap_or_default(),
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
