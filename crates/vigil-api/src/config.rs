//! Server configuration.

use serde::{Deserialize, Serialize};

use vigil_core::{Error, Result};

/// CORS configuration for the HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorsConfig {
    /// Allowed origins. `"*"` must be the only entry when present and is
    /// rejected in production mode.
    pub allowed_origins: Vec<String>,
    /// Preflight cache duration in seconds.
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            max_age_seconds: 3600,
        }
    }
}

/// Record store connection configuration.
///
/// Points at a PostgREST-style REST endpoint (e.g. a Supabase project). When
/// absent in debug mode, the server falls back to the in-memory store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Base URL of the REST endpoint.
    pub url: Option<String>,
    /// API key sent as `apikey` and bearer token.
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    /// Table holding duty records.
    pub table: String,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// HTTP listen port.
    pub http_port: u16,
    /// Debug mode: pretty logs and in-memory store fallback.
    pub debug: bool,
    /// CORS settings.
    pub cors: CorsConfig,
    /// Record store settings.
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            debug: true,
            cors: CorsConfig::default(),
            store: StoreConfig {
                url: None,
                api_key: None,
                table: "admin_dashboard".to_string(),
            },
        }
    }
}

impl Config {
    /// Loads configuration from `VIGIL_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when a variable is present but
    /// unparseable.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("VIGIL_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = env_bool("VIGIL_DEBUG")? {
            config.debug = debug;
        }

        if let Some(origins) = env_string("VIGIL_CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = parse_cors_allowed_origins(&origins);
        }
        if let Some(max_age) = env_u64("VIGIL_CORS_MAX_AGE_SECONDS")? {
            config.cors.max_age_seconds = max_age;
        }

        config.store.url = env_string("VIGIL_STORE_URL");
        config.store.api_key = env_string("VIGIL_STORE_API_KEY");
        if let Some(table) = env_string("VIGIL_STORE_TABLE") {
            config.store.table = table;
        }

        Ok(config)
    }

    /// Validates settings that only matter at serve time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when production mode lacks a store URL
    /// or carries an unsafe CORS wildcard.
    pub fn validate(&self) -> Result<()> {
        if !self.debug && self.store.url.is_none() {
            return Err(Error::InvalidInput(
                "VIGIL_STORE_URL is required when VIGIL_DEBUG=false".to_string(),
            ));
        }

        if !self.debug
            && self
                .cors
                .allowed_origins
                .iter()
                .any(|origin| origin == "*")
        {
            return Err(Error::InvalidInput(
                "cors.allowed_origins cannot include '*' when debug=false".to_string(),
            ));
        }

        if self.cors.allowed_origins.len() > 1
            && self.cors.allowed_origins.iter().any(|origin| origin == "*")
        {
            return Err(Error::InvalidInput(
                "'*' must be the only allowed CORS origin".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_u16(name: &str) -> Result<Option<u16>> {
    env_string(name)
        .map(|value| {
            value
                .parse::<u16>()
                .map_err(|e| Error::InvalidInput(format!("{name} must be a port number: {e}")))
        })
        .transpose()
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    env_string(name)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|e| Error::InvalidInput(format!("{name} must be an integer: {e}")))
        })
        .transpose()
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    env_string(name)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(Error::InvalidInput(format!(
                "{name} must be a boolean, got {other:?}"
            ))),
        })
        .transpose()
}

fn parse_cors_allowed_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
