//! Pipeline composition: combines all middleware layers into a single service stack.

use std::sync::Arc;

use tower::ServiceBuilder;

use super::broker::BrokerService;
use super::deadline::{DeadlineLayer, DeadlineService};
use super::metrics::{MetricsLayer, MetricsService};
use crate::traits::{BrokerTransport, MetricsSink};

/// The composed dispatch service stack.
pub type DispatchPipeline = MetricsService<DeadlineService<BrokerService>>;

/// Build the dispatch pipeline around the injected transport and metrics sink.
///
/// Layer order (outermost to innermost):
/// 1. `MetricsLayer` -- observe every dispatch, whichever way it ends
/// 2. `DeadlineLayer` -- bounded sub-context and caller cancellation
/// 3. `BrokerService` -- the single transport attempt
///
/// The returned service is `Clone`; each call works on its own clone.
#[must_use]
pub fn build_dispatch_pipeline(
    transport: Arc<dyn BrokerTransport>,
    sink: Arc<dyn MetricsSink>,
    delay_exchange: &str,
) -> DispatchPipeline {
    ServiceBuilder::new()
        .layer(MetricsLayer::new(sink))
        .layer(DeadlineLayer)
        .service(BrokerService::new(transport, delay_exchange))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
