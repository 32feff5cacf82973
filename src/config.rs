use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::ConnectError;

pub const USERNAME_KEY: &str = "MONGO_USERNAME";
pub const PASSWORD_KEY: &str = "MONGO_PASSWORD";
pub const CLUSTER_URL_KEY: &str = "MONGO_CLUSTER_URL";
pub const DATABASE_NAME_KEY: &str = "DATABASE_NAME";
pub const SCHEME_KEY: &str = "MONGO_SCHEME";
pub const CONNECT_TIMEOUT_KEY: &str = "MONGO_CONNECT_TIMEOUT_MS";
pub const WRITE_TIMEOUT_KEY: &str = "MONGO_WRITE_TIMEOUT_MS";

const DEFAULT_SCHEME: &str = "mongodb+srv";
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_WRITE_TIMEOUT_MS: u64 = 10_000;

/// Where secret values come from. The process environment in production,
/// a plain map in tests.
pub trait SecretSource {
    fn get(&self, key: &str) -> Option<String>;
}

pub struct EnvSource;

impl SecretSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl SecretSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Raw configuration captured at startup and handed to the connector.
///
/// Nothing is validated here; `resolve` checks the required keys on every
/// connection attempt so a missing value is reported before any network I/O.
#[derive(Clone, Default)]
pub struct Secrets {
    username: Option<String>,
    password: Option<String>,
    cluster_url: Option<String>,
    database_name: Option<String>,
    scheme: Option<String>,
    connect_timeout_ms: Option<String>,
    write_timeout_ms: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self::from_source(&EnvSource)
    }

    pub fn from_source(source: &impl SecretSource) -> Self {
        Self {
            username: source.get(USERNAME_KEY),
            password: source.get(PASSWORD_KEY),
            cluster_url: source.get(CLUSTER_URL_KEY),
            database_name: source.get(DATABASE_NAME_KEY),
            scheme: source.get(SCHEME_KEY),
            connect_timeout_ms: source.get(CONNECT_TIMEOUT_KEY),
            write_timeout_ms: source.get(WRITE_TIMEOUT_KEY),
        }
    }

    pub fn resolve(&self) -> Result<MongoSettings, ConnectError> {
        let username = required(USERNAME_KEY, &self.username)?;
        let password = required(PASSWORD_KEY, &self.password)?;
        let cluster_url = required(CLUSTER_URL_KEY, &self.cluster_url)?;
        let database_name = required(DATABASE_NAME_KEY, &self.database_name)?;

        let scheme = self
            .scheme
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_SCHEME)
            .to_string();

        Ok(MongoSettings {
            username,
            password,
            cluster_url: cluster_url.trim_end_matches('/').to_string(),
            database_name,
            scheme,
            connect_timeout: millis(
                CONNECT_TIMEOUT_KEY,
                &self.connect_timeout_ms,
                DEFAULT_CONNECT_TIMEOUT_MS,
            )?,
            write_timeout: millis(WRITE_TIMEOUT_KEY, &self.write_timeout_ms, DEFAULT_WRITE_TIMEOUT_MS)?,
        })
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("cluster_url", &self.cluster_url)
            .field("database_name", &self.database_name)
            .field("scheme", &self.scheme)
            .finish()
    }
}

fn required(key: &'static str, value: &Option<String>) -> Result<String, ConnectError> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(ConnectError::MissingConfiguration { key }),
    }
}

fn millis(key: &'static str, value: &Option<String>, default: u64) -> Result<Duration, ConnectError> {
    let Some(raw) = value.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(Duration::from_millis(default));
    };

    match raw.parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConnectError::InvalidConfiguration {
            key,
            value: raw.to_string(),
        }),
    }
}

/// Validated connection settings.
#[derive(Clone)]
pub struct MongoSettings {
    pub username: String,
    pub password: String,
    pub cluster_url: String,
    pub database_name: String,
    pub scheme: String,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
}

impl MongoSettings {
    /// Connection target without credentials; those travel separately.
    pub fn connection_target(&self) -> String {
        format!("{}://{}/", self.scheme, self.cluster_url)
    }
}
