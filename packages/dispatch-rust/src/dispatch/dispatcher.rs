//! The dispatcher: entry point used by the per-service request wrappers.

use std::sync::Arc;
use std::time::Duration;

use courier_core::{Destination, DestinationTable, Request, ResourceTag, ServiceName};
use tower::ServiceExt;
use tracing::warn;

use super::call::{Dispatch, DispatchResult};
use super::config::DispatchConfig;
use super::middleware::{build_dispatch_pipeline, DispatchPipeline};
use crate::context::CallContext;
use crate::traits::{BrokerTransport, MetricsSink};

/// Executes single remote calls over the broker.
///
/// Stateless apart from the injected transport and metrics sink, so one
/// dispatcher can serve any number of concurrent callers. Cloning is cheap.
#[derive(Clone)]
pub struct Dispatcher {
    pipeline: DispatchPipeline,
    publisher: Arc<str>,
    destinations: Arc<DestinationTable>,
    default_timeout: Duration,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        transport: Arc<dyn BrokerTransport>,
        sink: Arc<dyn MetricsSink>,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            pipeline: build_dispatch_pipeline(transport, sink, &config.delay_exchange),
            publisher: Arc::from(config.publisher.as_str()),
            destinations: Arc::new(config.destination_table()),
            default_timeout: config.default_timeout(),
        }
    }

    #[must_use]
    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    #[must_use]
    pub fn destinations(&self) -> &DestinationTable {
        &self.destinations
    }

    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Execute one remote call.
    ///
    /// With a zero `delay` the request is sent as an RPC and the reply is
    /// awaited for at most `timeout` (less if `ctx` has an earlier deadline).
    /// With a non-zero `delay` the request is scheduled on the delay exchange
    /// and `Ok(None)` is returned once the broker accepted it.
    ///
    /// # Errors
    ///
    /// See [`DispatchError`](super::DispatchError). Error status codes in the
    /// reply are not errors at this level.
    pub async fn dispatch(
        &self,
        ctx: &CallContext,
        destination: &Destination,
        mut request: Request,
        resource: &ResourceTag,
        timeout: Duration,
        delay: Duration,
    ) -> DispatchResult {
        request.publisher = self.publisher.to_string();

        let dispatch = Dispatch {
            ctx: ctx.clone(),
            destination: destination.clone(),
            resource: resource.clone(),
            request,
            timeout,
            delay,
        };
        if let Err(e) = dispatch.validate() {
            warn!(destination = %destination, error = %e, "rejected dispatch");
            return Err(e);
        }

        self.pipeline.clone().oneshot(dispatch).await
    }

    /// Raw send to an arbitrary destination without a resource tag.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch`](Self::dispatch).
    pub async fn send_request(
        &self,
        ctx: &CallContext,
        destination: &Destination,
        request: Request,
        timeout: Duration,
        delay: Duration,
    ) -> DispatchResult {
        self.dispatch(ctx, destination, request, &ResourceTag::NONE, timeout, delay)
            .await
    }

    /// Send to a logical service's request queue.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch`](Self::dispatch).
    pub async fn send_to_service(
        &self,
        ctx: &CallContext,
        service: ServiceName,
        request: Request,
        resource: &ResourceTag,
        timeout: Duration,
        delay: Duration,
    ) -> DispatchResult {
        let destination = self.destinations.resolve_service(service);
        self.dispatch(ctx, &destination, request, resource, timeout, delay)
            .await
    }

    /// Send to a single media node. Unknown nodes never answer and time out.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch`](Self::dispatch).
    pub async fn send_to_node(
        &self,
        ctx: &CallContext,
        node_id: &str,
        request: Request,
        resource: &ResourceTag,
        timeout: Duration,
        delay: Duration,
    ) -> DispatchResult {
        let destination = self.destinations.resolve_node(node_id);
        self.dispatch(ctx, &destination, request, resource, timeout, delay)
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
