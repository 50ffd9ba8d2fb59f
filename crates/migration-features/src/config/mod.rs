use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the feature decision service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub migration_api: MigrationApiConfig,
    pub rules: RulesConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let base_url = env::var("MIGRATION_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8081".to_string());
        let endpoint = env::var("MIGRATION_API_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ACCOUNTS_ENDPOINT.to_string());
        if !endpoint.contains(CUSTOMER_ID_PLACEHOLDER) {
            return Err(ConfigError::MissingCustomerPlaceholder { endpoint });
        }
        let timeout_ms = env::var("MIGRATION_API_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;

        let rules_path = env::var("RULES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("rules/migration-rules.csv"));

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            migration_api: MigrationApiConfig {
                base_url,
                endpoint,
                timeout: Duration::from_millis(timeout_ms),
            },
            rules: RulesConfig { path: rules_path },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

pub const CUSTOMER_ID_PLACEHOLDER: &str = "{customerId}";
pub const DEFAULT_ACCOUNTS_ENDPOINT: &str = "/api/migration/customers/{customerId}/accounts";

/// Location of the upstream migration system that owns account records.
#[derive(Debug, Clone)]
pub struct MigrationApiConfig {
    pub base_url: String,
    /// Path appended to `base_url`; must contain `{customerId}`.
    pub endpoint: String,
    pub timeout: Duration,
}

/// Where the decision table is read from at startup.
#[derive(Debug, Clone)]
pub struct RulesConfig {
    pub path: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    MissingCustomerPlaceholder { endpoint: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "MIGRATION_API_TIMEOUT_MS must be a whole number of milliseconds")
            }
            ConfigError::MissingCustomerPlaceholder { endpoint } => write!(
                f,
                "MIGRATION_API_ENDPOINT '{}' must contain {}",
                endpoint, CUSTOMER_ID_PLACEHOLDER
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::MissingCustomerPlaceholder { .. } => None,
        }
    }
}
