use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the Marquee binary.
#[derive(Debug, Parser)]
#[command(name = "marquee", version, about = "Marquee catalog query server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MARQUEE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the catalog HTTP service (default).
    Serve(Box<ServeArgs>),
    /// Ping the search index and cache, then exit.
    Check(CheckArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub backends: BackendOverrides,
}

/// Backend locations, shared by every subcommand that talks to them.
#[derive(Debug, Args, Default, Clone)]
pub struct BackendOverrides {
    /// Override the search index base URL.
    #[arg(long = "index-url", value_name = "URL")]
    pub index_url: Option<String>,

    /// Override the cache URL (`redis://...`).
    #[arg(long = "cache-url", value_name = "URL")]
    pub cache_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub backends: BackendOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the search index connection limit.
    #[arg(long = "index-max-connections", value_name = "COUNT")]
    pub index_max_connections: Option<u32>,

    /// Override the search index request timeout.
    #[arg(long = "index-request-timeout-ms", value_name = "MILLIS")]
    pub index_request_timeout_ms: Option<u64>,

    /// Toggle the cache layer.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Toggle single-flight population of cache misses.
    #[arg(
        long = "cache-single-flight",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_single_flight: Option<bool>,

    /// Override the cache connection limit.
    #[arg(long = "cache-max-connections", value_name = "COUNT")]
    pub cache_max_connections: Option<u32>,
}
