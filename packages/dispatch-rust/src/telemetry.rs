//! Process-wide observability bootstrap: tracing subscriber and Prometheus exporter.

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;

use crate::dispatch::DispatchConfig;
use crate::metrics::{PrometheusSink, REQUEST_PROCESS_TIME_BUCKETS};

/// Install the global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. `json` selects
/// structured JSON lines instead of the human-readable format.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// Prometheus builder with the request histogram buckets applied to `sink`'s metric.
fn prometheus_builder(sink: &PrometheusSink) -> anyhow::Result<PrometheusBuilder> {
    Ok(PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(sink.metric_name().to_string()),
        &REQUEST_PROCESS_TIME_BUCKETS,
    )?)
}

/// Register the unit and help text of the request histogram with the current recorder.
fn describe_request_metrics(sink: &PrometheusSink) {
    ::metrics::describe_histogram!(
        sink.metric_name().to_string(),
        ::metrics::Unit::Milliseconds,
        "Process time of send/receive requests"
    );
}

/// Install the Prometheus recorder and return the sink that feeds it.
///
/// Serves `/metrics` on `config.prometheus_listen` when set. Otherwise only
/// the recorder is installed and its [`PrometheusHandle`] is returned so the
/// embedding process can render the scrape output itself. Must be called from
/// within a tokio runtime when a listener is configured.
///
/// # Errors
///
/// Returns an error if the bucket layout is rejected or a global recorder is
/// already installed.
pub fn install_prometheus(
    config: &DispatchConfig,
) -> anyhow::Result<(PrometheusSink, Option<PrometheusHandle>)> {
    let sink = PrometheusSink::new(&config.metric_namespace());
    let builder = prometheus_builder(&sink)?;

    let handle = match config.prometheus_listen {
        Some(addr) => {
            builder.with_http_listener(addr).install()?;
            None
        }
        None => Some(builder.install_recorder()?),
    };

    describe_request_metrics(&sink);
    tracing::info!(
        metric = sink.metric_name(),
        listen = ?config.prometheus_listen,
        "prometheus recorder installed"
    );

    Ok((sink, handle))
}
