use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_QUOTE_API_URL: &str = "https://economia.awesomeapi.com.br/json/last/USD-BRL";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/database.db?mode=rwc";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/cotacao";
pub const DEFAULT_OUTPUT_PATH: &str = "cotacao.txt";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    ZeroDuration { key: &'static str },
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
        }
    }
}

/// Everything the server needs, passed explicitly to each component.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub quote_api_url: String,
    /// Transport-level ceiling on the shared HTTP client. The per-request
    /// upstream deadline is normally much tighter than this.
    pub upstream_http_timeout: Duration,
    /// Budget for the whole inbound request (`D_total`).
    pub request_timeout: Duration,
    /// Budget for the upstream fetch (`D_api`), nested in `request_timeout`.
    pub upstream_timeout: Duration,
    /// Budget for the database write (`D_db`), nested in `request_timeout`.
    pub db_timeout: Duration,
    pub database: DatabaseConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            quote_api_url: DEFAULT_QUOTE_API_URL.to_string(),
            upstream_http_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(1),
            upstream_timeout: Duration::from_millis(200),
            db_timeout: Duration::from_secs(10),
            database: DatabaseConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset keys keep the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr)?,
            quote_api_url: lookup("QUOTE_API_URL").unwrap_or(defaults.quote_api_url),
            upstream_http_timeout: millis_or(
                &lookup,
                "UPSTREAM_HTTP_TIMEOUT_MS",
                defaults.upstream_http_timeout,
            )?,
            request_timeout: millis_or(&lookup, "REQUEST_TIMEOUT_MS", defaults.request_timeout)?,
            upstream_timeout: millis_or(&lookup, "UPSTREAM_TIMEOUT_MS", defaults.upstream_timeout)?,
            db_timeout: millis_or(&lookup, "DB_TIMEOUT_MS", defaults.db_timeout)?,
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: parse_or(
                    &lookup,
                    "DB_MAX_CONNECTIONS",
                    defaults.database.max_connections,
                )?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_zero("UPSTREAM_HTTP_TIMEOUT_MS", self.upstream_http_timeout)?;
        non_zero("REQUEST_TIMEOUT_MS", self.request_timeout)?;
        non_zero("UPSTREAM_TIMEOUT_MS", self.upstream_timeout)?;
        non_zero("DB_TIMEOUT_MS", self.db_timeout)?;
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                value: "0".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub timeout: Duration,
    pub output_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            timeout: Duration::from_millis(3000),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let timeout = millis_or(&lookup, "CLIENT_TIMEOUT_MS", defaults.timeout)?;
        non_zero("CLIENT_TIMEOUT_MS", timeout)?;

        Ok(Self {
            server_url: lookup("COTACAO_SERVER_URL").unwrap_or(defaults.server_url),
            timeout,
            output_path: lookup("COTACAO_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_path),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn millis_or<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let millis = parse_or(lookup, key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(millis))
}

fn non_zero(key: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::ZeroDuration { key });
    }
    Ok(())
}
