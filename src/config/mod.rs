//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::catalog::{DEFAULT_FILM_TTL, DEFAULT_GENRE_TTL, DEFAULT_PERSON_TTL};

mod cli;

pub use cli::{BackendOverrides, CheckArgs, CliArgs, Command, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "marquee";
const ENV_PREFIX: &str = "MARQUEE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_INDEX_URL: &str = "http://127.0.0.1:9200";
const DEFAULT_INDEX_MAX_CONNECTIONS: u32 = 16;
const DEFAULT_INDEX_ACQUIRE_TIMEOUT_MS: u64 = 1_000;
const DEFAULT_INDEX_REQUEST_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CACHE_MAX_CONNECTIONS: u32 = 16;
const DEFAULT_CACHE_ACQUIRE_TIMEOUT_MS: u64 = 500;
const DEFAULT_CACHE_COMMAND_TIMEOUT_MS: u64 = 250;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub index: IndexSettings,
    pub cache: CacheSettings,
    pub ttl: TtlSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub url: Url,
    pub max_connections: NonZeroU32,
    pub acquire_timeout: Duration,
    pub request_timeout: Duration,
}

/// Cache backend settings. Without a URL an in-process store is used.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub url: Option<Url>,
    pub max_connections: NonZeroU32,
    pub acquire_timeout: Duration,
    pub command_timeout: Duration,
    pub single_flight: bool,
}

#[derive(Debug, Clone)]
pub struct TtlSettings {
    pub films: Duration,
    pub genres: Duration,
    pub persons: Duration,
}

/// Bearer tokens accepted on the catalog API. Empty means open access.
#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
    pub tokens: Vec<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("auth.tokens"),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Check(args)) => raw.apply_backend_overrides(&args.backends),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    index: RawIndexSettings,
    cache: RawCacheSettings,
    ttl: RawTtlSettings,
    auth: RawAuthSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(max) = overrides.index_max_connections {
            self.index.max_connections = Some(max);
        }
        if let Some(timeout) = overrides.index_request_timeout_ms {
            self.index.request_timeout_ms = Some(timeout);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(single_flight) = overrides.cache_single_flight {
            self.cache.single_flight = Some(single_flight);
        }
        if let Some(max) = overrides.cache_max_connections {
            self.cache.max_connections = Some(max);
        }

        self.apply_backend_overrides(&overrides.backends);
    }

    fn apply_backend_overrides(&mut self, overrides: &BackendOverrides) {
        if let Some(url) = overrides.index_url.as_ref() {
            self.index.url = Some(url.clone());
        }
        if let Some(url) = overrides.cache_url.as_ref() {
            self.cache.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            index,
            cache,
            ttl,
            auth,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            index: build_index_settings(index)?,
            cache: build_cache_settings(cache)?,
            ttl: build_ttl_settings(ttl)?,
            auth: build_auth_settings(auth),
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_index_settings(index: RawIndexSettings) -> Result<IndexSettings, LoadError> {
    let raw_url = index.url.unwrap_or_else(|| DEFAULT_INDEX_URL.to_string());
    let url = parse_url(&raw_url, &["http", "https"], "index.url")?;

    let max_connections = non_zero_u32(
        index
            .max_connections
            .unwrap_or(DEFAULT_INDEX_MAX_CONNECTIONS)
            .into(),
        "index.max_connections",
    )?;
    let acquire_timeout = millis(
        index
            .acquire_timeout_ms
            .unwrap_or(DEFAULT_INDEX_ACQUIRE_TIMEOUT_MS),
        "index.acquire_timeout_ms",
    )?;
    let request_timeout = millis(
        index
            .request_timeout_ms
            .unwrap_or(DEFAULT_INDEX_REQUEST_TIMEOUT_MS),
        "index.request_timeout_ms",
    )?;

    Ok(IndexSettings {
        url,
        max_connections,
        acquire_timeout,
        request_timeout,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let url = match cache.url.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => {
            Some(parse_url(value, &["redis", "rediss"], "cache.url")?)
        }
        _ => None,
    };

    let max_connections = non_zero_u32(
        cache
            .max_connections
            .unwrap_or(DEFAULT_CACHE_MAX_CONNECTIONS)
            .into(),
        "cache.max_connections",
    )?;
    let acquire_timeout = millis(
        cache
            .acquire_timeout_ms
            .unwrap_or(DEFAULT_CACHE_ACQUIRE_TIMEOUT_MS),
        "cache.acquire_timeout_ms",
    )?;
    let command_timeout = millis(
        cache
            .command_timeout_ms
            .unwrap_or(DEFAULT_CACHE_COMMAND_TIMEOUT_MS),
        "cache.command_timeout_ms",
    )?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        url,
        max_connections,
        acquire_timeout,
        command_timeout,
        single_flight: cache.single_flight.unwrap_or(true),
    })
}

fn build_ttl_settings(ttl: RawTtlSettings) -> Result<TtlSettings, LoadError> {
    Ok(TtlSettings {
        films: ttl_seconds(ttl.films, DEFAULT_FILM_TTL, "ttl.films")?,
        genres: ttl_seconds(ttl.genres, DEFAULT_GENRE_TTL, "ttl.genres")?,
        persons: ttl_seconds(ttl.persons, DEFAULT_PERSON_TTL, "ttl.persons")?,
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> AuthSettings {
    let tokens = auth
        .tokens
        .unwrap_or_default()
        .into_iter()
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .collect();
    AuthSettings { tokens }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawIndexSettings {
    url: Option<String>,
    max_connections: Option<u32>,
    acquire_timeout_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    url: Option<String>,
    max_connections: Option<u32>,
    acquire_timeout_ms: Option<u64>,
    command_timeout_ms: Option<u64>,
    single_flight: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTtlSettings {
    films: Option<u64>,
    genres: Option<u64>,
    persons: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    tokens: Option<Vec<String>>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_url(raw: &str, schemes: &[&str], key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| LoadError::invalid(key, format!("invalid URL `{raw}`: {err}")))?;
    if !schemes.contains(&url.scheme()) {
        return Err(LoadError::invalid(
            key,
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }
    Ok(url)
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn millis(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_millis(value))
}

fn ttl_seconds(
    value: Option<u64>,
    default: Duration,
    key: &'static str,
) -> Result<Duration, LoadError> {
    match value {
        Some(0) => Err(LoadError::invalid(key, "must be greater than zero")),
        Some(seconds) => Ok(Duration::from_secs(seconds)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests;
