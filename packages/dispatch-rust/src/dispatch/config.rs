use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use courier_core::destination::{DEFAULT_DELAY_EXCHANGE, DEFAULT_NODE_TEMPLATE};
use courier_core::envelope::DEFAULT_REQUEST_TIMEOUT;
use courier_core::{DestinationTable, ServiceName};
use serde::Deserialize;

/// Dispatcher configuration.
///
/// Controls the sender identity, destination naming, default timeout, and
/// metrics exposition. Loaded by surrounding code and handed to
/// [`Dispatcher::new`](super::Dispatcher::new).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Service identity stamped on every outgoing request (e.g. `"call-manager"`).
    pub publisher: String,
    /// Prefix of the latency histogram name. Derived from `publisher` when unset.
    pub metric_namespace: Option<String>,
    /// Timeout for callers that do not pick their own, in milliseconds.
    pub default_timeout_ms: u64,
    /// Exchange that holds delayed requests.
    pub delay_exchange: String,
    /// Per-node destination template; `{id}` is replaced by the node identifier.
    pub node_destination_template: String,
    /// Services whose request queue differs from the default naming.
    pub destination_overrides: HashMap<ServiceName, String>,
    /// Address for the Prometheus scrape endpoint. `None` disables the listener.
    pub prometheus_listen: Option<SocketAddr>,
}

impl DispatchConfig {
    /// Defaults with the given publisher identity.
    #[must_use]
    pub fn new(publisher: impl Into<String>) -> Self {
        Self {
            publisher: publisher.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Histogram namespace: the explicit one, or the publisher with `-` mapped to `_`.
    #[must_use]
    pub fn metric_namespace(&self) -> String {
        self.metric_namespace
            .clone()
            .unwrap_or_else(|| self.publisher.replace('-', "_"))
    }

    #[must_use]
    pub fn destination_table(&self) -> DestinationTable {
        DestinationTable::with_overrides(&self.destination_overrides, &self.node_destination_template)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let default_timeout_ms = DEFAULT_REQUEST_TIMEOUT.as_millis() as u64;
        Self {
            publisher: String::new(),
            metric_namespace: None,
            default_timeout_ms,
            delay_exchange: DEFAULT_DELAY_EXCHANGE.to_string(),
            node_destination_template: DEFAULT_NODE_TEMPLATE.to_string(),
            destination_overrides: HashMap::new(),
            prometheus_listen: None,
        }
    }
}
