use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::query::{
    METRIC_CACHE_ERROR, METRIC_CACHE_HIT, METRIC_CACHE_MISS, METRIC_INDEX_QUERY_MS,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Client crates that log every connection at debug.
const QUIET_DEPENDENCIES: [&str; 3] = ["hyper_util=warn", "reqwest=warn", "redis=warn"];

/// Install the global tracing subscriber and describe the catalog metrics.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let mut env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();
    for directive in QUIET_DEPENDENCIES {
        let directive = directive
            .parse()
            .map_err(|err| {
                InfraError::telemetry(format!("invalid directive `{directive}`: {err}"))
            })?;
        env_filter = env_filter.add_directive(directive);
    }

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Total number of catalog cache hits, by entity."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Total number of catalog cache misses, by entity."
        );
        describe_counter!(
            METRIC_CACHE_ERROR,
            Unit::Count,
            "Total number of cache reads or writes that failed and were absorbed."
        );
        describe_histogram!(
            METRIC_INDEX_QUERY_MS,
            Unit::Milliseconds,
            "Search index round-trip latency in milliseconds, by entity."
        );
    });
}
