use crate::{
    error::{ConfigError, Result},
    mcp::McpTransport,
};
use serde::{Deserialize, Serialize};
use std::{env, path::Path, str::FromStr, time::Duration};

pub const DEFAULT_NAMESPACE: &str = "pantry";
pub const DEFAULT_DATABASE: &str = "shopping";
pub const DEFAULT_MCP_PORT: u16 = 8790;
pub const FALLBACK_USER_ID: &str = "default_user";

/// Main configuration for Pantry
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Document store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// MCP server configuration
    #[serde(default)]
    pub mcp: McpConfig,
    /// Caller-identity configuration
    #[serde(default)]
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store endpoint, e.g. `memory`, `surrealkv://pantry.db` or `ws://host:8000`
    pub endpoint: String,
    /// Namespace selected after connect
    pub namespace: String,
    /// Database selected after connect
    pub database: String,
    /// Budget for establishing the connection, in milliseconds
    pub connect_timeout_ms: u64,
    /// Budget for the post-connect readiness probe, in milliseconds
    pub ready_timeout_ms: u64,
    /// Upper bound on outbound store connections
    pub max_connections: u32,
    /// Lower bound on outbound store connections
    pub min_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            connect_timeout_ms: 10_000,
            ready_timeout_ms: 5_000,
            max_connections: 50,
            min_connections: 10,
        }
    }
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// MCP transport type
    pub transport: McpTransport,
    /// Port for the HTTP transport
    pub port: Option<u16>,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            transport: McpTransport::Stdio,
            port: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentityConfig {
    /// Explicit caller-identity override, ahead of OS-user detection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_user: Option<String>,
}

/// Endpoint schemes the store adapter knows how to open.
const SUPPORTED_SCHEMES: &[&str] = &[
    "mem://",
    "surrealkv://",
    "rocksdb://",
    "ws://",
    "wss://",
    "http://",
    "https://",
];

impl Config {
    /// Load configuration from an optional TOML file overridden by
    /// environment variables. Malformed environment values fail here, at
    /// startup, rather than surfacing mid-request.
    pub fn load() -> Result<Self> {
        let config_path = env::var("PANTRY_CONFIG").unwrap_or_else(|_| "pantry.toml".to_string());

        let config = if Path::new(&config_path).exists() {
            let contents =
                std::fs::read_to_string(&config_path).map_err(|_e| ConfigError::NotFound {
                    path: config_path.clone(),
                })?;
            toml::from_str::<Config>(&contents)
                .map_err(|e| ConfigError::ParseFailed { source: e })?
        } else {
            Config::default()
        };

        config.apply_env_overrides()
    }

    /// Override config values with environment variables
    fn apply_env_overrides(mut self) -> Result<Self> {
        if let Ok(endpoint) = env::var("DATABASE_URL") {
            self.store.endpoint = endpoint;
        }
        if let Ok(ns) = env::var("DATABASE_NS") {
            self.store.namespace = ns;
        }
        if let Ok(db) = env::var("DATABASE_NAME") {
            self.store.database = db;
        }
        if let Some(ms) = parse_env("CONNECT_TIMEOUT_MS")? {
            self.store.connect_timeout_ms = ms;
        }
        if let Some(ms) = parse_env("READY_TIMEOUT_MS")? {
            self.store.ready_timeout_ms = ms;
        }
        if let Some(n) = parse_env("MAX_CONNECTIONS")? {
            self.store.max_connections = n;
        }
        if let Some(n) = parse_env("MIN_CONNECTIONS")? {
            self.store.min_connections = n;
        }

        if let Some(transport) = parse_env("MCP_TRANSPORT")? {
            self.mcp.transport = transport;
        }
        if let Some(port) = parse_env("MCP_PORT")? {
            self.mcp.port = Some(port);
        }

        if let Ok(user) = env::var("PANTRY_USER_ID") {
            if !user.trim().is_empty() {
                self.identity.override_user = Some(user);
            }
        }

        Ok(self)
    }

    /// Validate the configuration. Called once at startup; any error here is
    /// fatal and no tool becomes available.
    pub fn validate(&self) -> Result<()> {
        let store = &self.store;

        if store.endpoint.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "store.endpoint (DATABASE_URL)".to_string(),
            }
            .into());
        }
        if store.endpoint != "memory" && !SUPPORTED_SCHEMES.iter().any(|s| store.endpoint.starts_with(s)) {
            return Err(ConfigError::Invalid {
                field: "store.endpoint".to_string(),
                reason: format!(
                    "unsupported scheme in '{}'; expected one of memory, {}",
                    store.endpoint,
                    SUPPORTED_SCHEMES.join(", ")
                ),
            }
            .into());
        }

        if store.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "store.namespace".to_string(),
                reason: "namespace cannot be empty".to_string(),
            }
            .into());
        }
        if store.database.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "store.database".to_string(),
                reason: "database name cannot be empty".to_string(),
            }
            .into());
        }

        if store.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "store.connect_timeout_ms".to_string(),
                reason: "connect timeout must be positive".to_string(),
            }
            .into());
        }
        if store.ready_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "store.ready_timeout_ms".to_string(),
                reason: "ready timeout must be positive".to_string(),
            }
            .into());
        }

        if store.max_connections == 0 {
            return Err(ConfigError::Invalid {
                field: "store.max_connections".to_string(),
                reason: "max connections must be positive".to_string(),
            }
            .into());
        }
        if store.max_connections < store.min_connections {
            return Err(ConfigError::Invalid {
                field: "store.max_connections".to_string(),
                reason: format!(
                    "max connections ({}) must be >= min connections ({})",
                    store.max_connections, store.min_connections
                ),
            }
            .into());
        }

        Ok(())
    }
}

/// Read and parse an environment variable, failing fast on malformed values.
fn parse_env<T>(var: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => {
            let value = raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                field: var.to_string(),
                reason: format!("cannot parse '{raw}': {e}"),
            })?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

/// Helper to load dotenv file if it exists
pub fn load_dotenv() {
    if let Ok(path) = env::var("DOTENV_PATH") {
        dotenvy::from_path(&path).ok();
    } else {
        dotenvy::dotenv().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_endpoint(endpoint: &str) -> Config {
        let mut config = Config::default();
        config.store.endpoint = endpoint.to_string();
        config
    }

    #[test]
    fn endpoint_is_required() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn known_schemes_pass() {
        for ep in [
            "memory",
            "mem://",
            "surrealkv://data/pantry.db",
            "ws://localhost:8000",
            "wss://store.example.com",
        ] {
            assert!(with_endpoint(ep).validate().is_ok(), "{ep}");
        }
    }

    #[test]
    fn unknown_scheme_fails() {
        assert!(with_endpoint("mongodb://cluster0").validate().is_err());
        assert!(with_endpoint("pantry.db").validate().is_err());
    }

    #[test]
    fn timeouts_must_be_positive() {
        let mut config = with_endpoint("memory");
        config.store.connect_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = with_endpoint("memory");
        config.store.ready_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn pool_bounds_are_checked() {
        let mut config = with_endpoint("memory");
        config.store.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = with_endpoint("memory");
        config.store.max_connections = 5;
        config.store.min_connections = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip_with_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [store]
            endpoint = "surrealkv://pantry.db"

            [mcp]
            transport = "http"
            port = 9100
            "#,
        )
        .unwrap();
        assert_eq!(parsed.store.endpoint, "surrealkv://pantry.db");
        assert_eq!(parsed.store.namespace, DEFAULT_NAMESPACE);
        assert_eq!(parsed.store.connect_timeout_ms, 10_000);
        assert_eq!(parsed.mcp.transport, McpTransport::Http);
        assert_eq!(parsed.mcp.port, Some(9100));
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn durations_convert() {
        let store = StoreConfig::default();
        assert_eq!(store.connect_timeout(), Duration::from_millis(10_000));
        assert_eq!(store.ready_timeout(), Duration::from_millis(5_000));
    }
}
