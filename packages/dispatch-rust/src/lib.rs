//! Courier Dispatch: broker request dispatch with bounded waits, delayed publishes and latency metrics.

pub mod context;
pub mod dispatch;
pub mod metrics;
pub mod reply;
pub mod telemetry;
pub mod traits;
pub mod transport;

pub use context::CallContext;
pub use dispatch::{DispatchConfig, DispatchError, DispatchResult, Dispatcher};
pub use traits::{BrokerTransport, MetricsSink, Observation, TransportError};
