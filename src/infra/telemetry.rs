use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing::Subscriber;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::bridge::METRIC_RESTORE;
use crate::client::{METRIC_HIT, METRIC_JOIN, METRIC_MISS, METRIC_REQUEST};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

/// Overrides `logging.level` with full `EnvFilter` directives, e.g.
/// `FETCH_CACHE_LOG=fetch_cache::client=debug`.
pub const LOG_ENV_VAR: &str = "FETCH_CACHE_LOG";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Closing `fetch` spans are logged, so every network request shows up with
/// its key and duration.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    tracing_subscriber::registry()
        .with(env_filter(logging))
        .with(ErrorLayer::default())
        .with(fmt_layer(logging.format))
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn env_filter(logging: &LoggingSettings) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy()
}

fn fmt_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
    }
}

/// Register descriptions for the cache's metrics with the installed recorder.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_HIT,
            Unit::Count,
            "Lookups answered from a settled cache entry."
        );
        describe_counter!(
            METRIC_MISS,
            Unit::Count,
            "Lookups that found nothing usable and started a fetch."
        );
        describe_counter!(
            METRIC_JOIN,
            Unit::Count,
            "Lookups that joined a fetch already running for the key."
        );
        describe_counter!(
            METRIC_REQUEST,
            Unit::Count,
            "Network requests issued, labelled by outcome."
        );
        describe_counter!(
            METRIC_RESTORE,
            Unit::Count,
            "Snapshot restores, labelled applied or rejected."
        );
    });
}
