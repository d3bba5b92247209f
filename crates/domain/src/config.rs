//! Environment-driven configuration shared by the logger binary and its
//! collaborators.

use std::{env, str::FromStr, time::Duration};

use cron::Schedule;
use thiserror::Error;
use url::Url;

const DEFAULT_PRICE_SYMBOL: &str = "RDD";
const DEFAULT_PRICE_API_URL: &str = "https://min-api.cryptocompare.com";
const DEFAULT_STARTUP_RETRY_SECS: u64 = 5;
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;

/// Key configuration derived from `.env`/process variables.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    rpc: RpcConfig,
    database_url: String,
    refresh_interval: RefreshInterval,
    startup_retry: Duration,
    price: Option<PriceConfig>,
}

impl LoggerConfig {
    /// Loads configuration by hydrating `.env` (if present) and reading the
    /// required process variables. Missing or malformed entries surface as
    /// `ConfigError` so the binary can respond gracefully.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let rpc = RpcConfig {
            host: get_required_var("RPC_HOSTNAME")?,
            port: parse_port("RPC_PORT")?,
            username: get_required_var("RPC_USERNAME")?,
            password: get_required_var("RPC_PASSWORD")?,
            info_method: match get_optional_var("RPC_INFO_METHOD") {
                Some(raw) => raw.parse()?,
                None => InfoMethod::GetInfo,
            },
            timeout: parse_seconds("RPC_TIMEOUT_SECONDS", DEFAULT_RPC_TIMEOUT_SECS)?,
        };

        let database_url = match get_optional_var("DATABASE_URL") {
            Some(url) => url,
            None => mysql_url_from_env()?,
        };

        let refresh_interval = get_required_var("REFRESH_INTERVAL")?.parse()?;

        let startup_retry = parse_seconds("STARTUP_RETRY_SECONDS", DEFAULT_STARTUP_RETRY_SECS)?;

        Ok(Self {
            rpc,
            database_url,
            refresh_interval,
            startup_retry,
            price: PriceConfig::from_env(),
        })
    }

    pub fn new(
        rpc: RpcConfig,
        database_url: impl Into<String>,
        refresh_interval: RefreshInterval,
    ) -> Self {
        Self {
            rpc,
            database_url: database_url.into(),
            refresh_interval,
            startup_retry: Duration::from_secs(DEFAULT_STARTUP_RETRY_SECS),
            price: None,
        }
    }

    pub fn with_startup_retry(mut self, startup_retry: Duration) -> Self {
        self.startup_retry = startup_retry;
        self
    }

    pub fn with_price(mut self, price: PriceConfig) -> Self {
        self.price = Some(price);
        self
    }

    pub fn rpc(&self) -> &RpcConfig {
        &self.rpc
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn refresh_interval(&self) -> &RefreshInterval {
        &self.refresh_interval
    }

    pub fn startup_retry(&self) -> Duration {
        self.startup_retry
    }

    pub fn price(&self) -> Option<&PriceConfig> {
        self.price.as_ref()
    }
}

/// Connection details for the upstream node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConfig {
    host: String,
    port: u16,
    username: String,
    password: String,
    info_method: InfoMethod,
    timeout: Duration,
}

impl RpcConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            info_method: InfoMethod::GetInfo,
            timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_info_method(mut self, info_method: InfoMethod) -> Self {
        self.info_method = info_method;
        self
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn info_method(&self) -> InfoMethod {
        self.info_method
    }

    /// Bound on a single RPC call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Which RPC method feeds the `getinfo` table. Newer nodes dropped `getinfo`
/// in favour of `getblockchaininfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InfoMethod {
    #[default]
    GetInfo,
    GetBlockchainInfo,
}

impl FromStr for InfoMethod {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "getinfo" => Ok(Self::GetInfo),
            "getblockchaininfo" => Ok(Self::GetBlockchainInfo),
            other => Err(ConfigError::InvalidInfoMethod(other.to_string())),
        }
    }
}

/// Market-data settings; present only when both an API key and at least one
/// currency are configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceConfig {
    api_key: String,
    api_url: String,
    symbol: String,
    currencies: Vec<String>,
}

impl PriceConfig {
    pub fn new(api_key: impl Into<String>, currencies: Vec<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_PRICE_API_URL.to_string(),
            symbol: DEFAULT_PRICE_SYMBOL.to_string(),
            currencies,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    fn from_env() -> Option<Self> {
        let api_key = get_optional_var("CC_API_KEY")?;
        let currencies = parse_list(&get_optional_var("CC_PRICES")?);
        if currencies.is_empty() {
            return None;
        }

        let mut config = Self::new(api_key, currencies);
        if let Some(symbol) = get_optional_var("CC_SYMBOL") {
            config = config.with_symbol(symbol.to_ascii_uppercase());
        }
        if let Some(api_url) = get_optional_var("CC_API_URL") {
            config = config.with_api_url(api_url.trim_end_matches('/'));
        }
        Some(config)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn currencies(&self) -> &[String] {
        &self.currencies
    }
}

/// Polling period: either a cron expression or a fixed duration.
#[derive(Debug, Clone)]
pub enum RefreshInterval {
    Cron(Box<Schedule>),
    Every(Duration),
}

impl FromStr for RefreshInterval {
    type Err = ConfigError;

    /// Accepts plain durations (`90`, `30s`, `5m`, `1h`) and cron expressions.
    /// Five-field expressions (minute resolution) get a leading `0` seconds
    /// field so they fire once per matching minute, and their weekdays are
    /// read with Sunday as `0` or `7`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if let Some(duration) = parse_duration(value) {
            if duration.is_zero() {
                return Err(ConfigError::InvalidSchedule {
                    value: value.to_string(),
                    reason: "interval must be greater than zero".to_string(),
                });
            }
            return Ok(Self::Every(duration));
        }

        let fields: Vec<&str> = value.split_whitespace().collect();
        let expression = match fields.as_slice() {
            [minute, hour, day, month, weekday] => format!(
                "0 {minute} {hour} {day} {month} {}",
                node_cron_weekdays(weekday)
            ),
            _ => value.to_string(),
        };
        let schedule =
            Schedule::from_str(&expression).map_err(|err| ConfigError::InvalidSchedule {
                value: value.to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self::Cron(Box::new(schedule)))
    }
}

const WEEKDAY_NAMES: [&str; 8] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Rewrites numeric weekdays (`0`-`7`, Sunday at both ends) as names, since
/// the `cron` crate numbers them `1`-`7`. Steps are left untouched.
fn node_cron_weekdays(field: &str) -> String {
    let name = |day: &str| -> Option<&'static str> {
        day.parse::<usize>()
            .ok()
            .and_then(|index| WEEKDAY_NAMES.get(index).copied())
    };

    field
        .split(',')
        .map(|item| {
            let (base, step) = match item.split_once('/') {
                Some((base, step)) => (base, Some(step)),
                None => (item, None),
            };
            let mapped = match base.split_once('-') {
                Some((start, "7")) if step.is_none() => match name(start) {
                    Some("Sun") => "Sun-Sat".to_string(),
                    Some(start) => format!("{start}-Sat,Sun"),
                    None => base.to_string(),
                },
                Some((start, end)) => match (name(start), name(end)) {
                    (Some(start), Some(end)) => format!("{start}-{end}"),
                    _ => base.to_string(),
                },
                None => name(base).map_or_else(|| base.to_string(), str::to_string),
            };
            match step {
                Some(step) => format!("{mapped}/{step}"),
                None => mapped,
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_duration(value: &str) -> Option<Duration> {
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let amount: u64 = digits.parse().ok()?;
    let seconds = match unit.trim() {
        "" | "s" | "sec" | "secs" => amount,
        "m" | "min" | "mins" => amount.checked_mul(60)?,
        "h" | "hr" | "hrs" => amount.checked_mul(3600)?,
        _ => return None,
    };
    Some(Duration::from_secs(seconds))
}

fn parse_seconds(key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match get_optional_var(key) {
        Some(raw) => raw
            .parse()
            .map(Duration::from_secs)
            .map_err(|source| ConfigError::InvalidNumber { key, source }),
        None => Ok(Duration::from_secs(default)),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_ascii_uppercase)
        .collect()
}

fn parse_port(key: &'static str) -> Result<u16, ConfigError> {
    get_required_var(key)?
        .parse()
        .map_err(|source| ConfigError::InvalidNumber { key, source })
}

fn mysql_url_from_env() -> Result<String, ConfigError> {
    let host = get_required_var("MYSQL_HOSTNAME")?;
    let port = parse_port("MYSQL_PORT")?;
    let user = get_required_var("MYSQL_USER")?;
    let password = get_required_var("MYSQL_PASSWORD")?;
    let database = get_required_var("MYSQL_DATABASE")?;

    let invalid = |reason: &str| ConfigError::InvalidDatabaseUrl(reason.to_string());
    let mut url = Url::parse("mysql://localhost").map_err(|err| invalid(&err.to_string()))?;
    url.set_host(Some(&host))
        .map_err(|err| invalid(&err.to_string()))?;
    url.set_port(Some(port))
        .map_err(|_| invalid("cannot set port"))?;
    url.set_username(&user)
        .map_err(|_| invalid("cannot set username"))?;
    url.set_password(Some(&password))
        .map_err(|_| invalid("cannot set password"))?;
    url.set_path(&database);
    Ok(url.to_string())
}

fn get_required_var(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(ConfigError::MissingVar { key })
            } else {
                Ok(trimmed.to_string())
            }
        }
        Err(_) => Err(ConfigError::MissingVar { key }),
    }
}

fn get_optional_var(key: &'static str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("RDD_LOGGER_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment parsing fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: &'static str },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("invalid refresh interval `{value}`: {reason}")]
    InvalidSchedule { value: String, reason: String },
    #[error("unsupported info method `{0}` (expected getinfo or getblockchaininfo)")]
    InvalidInfoMethod(String),
    #[error("cannot build database url: {0}")]
    InvalidDatabaseUrl(String),
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}
