//! Tower middleware layers for the dispatch pipeline.
//!
//! - [`metrics`]: Latency observation per dispatch plus a `tracing` span
//! - [`deadline`]: Bounded sub-context and cancellation enforcement
//! - [`broker`]: Innermost service that calls the broker transport
//! - [`pipeline`]: Composes all layers into a single service stack

pub mod broker;
pub mod deadline;
pub mod metrics;
pub mod pipeline;

pub use broker::BrokerService;
pub use deadline::DeadlineLayer;
pub use metrics::MetricsLayer;
pub use pipeline::{build_dispatch_pipeline, DispatchPipeline};
