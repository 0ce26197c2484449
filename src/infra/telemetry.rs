//! Tracing subscriber and metric descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

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
            "tcm_preview_total",
            Unit::Count,
            "Total number of preview renders requested."
        );
        describe_counter!(
            "tcm_preview_failed_total",
            Unit::Count,
            "Total number of preview renders that failed, labelled by stage."
        );
        describe_histogram!(
            "tcm_preview_ms",
            Unit::Milliseconds,
            "Preview pipeline latency in milliseconds."
        );
        describe_counter!(
            "tcm_config_write_total",
            Unit::Count,
            "Total number of configuration documents persisted."
        );
        describe_counter!(
            "tcm_search_client_init_total",
            Unit::Count,
            "Total number of metadata search clients constructed."
        );
    });
}
