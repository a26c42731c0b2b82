//! Metrics middleware for dispatches.
//!
//! Records one latency observation per dispatch into the injected
//! [`MetricsSink`], keyed by destination, resource tag and method, and wraps
//! the call in a `tracing` span carrying duration and outcome. Sits outside the
//! deadline layer so timed-out and cancelled calls are observed too.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use courier_core::Response;
use tokio::time::Instant;
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::dispatch::call::{Dispatch, DispatchError};
use crate::traits::{MetricsSink, Observation};

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments dispatches with latency observations.
#[derive(Clone)]
pub struct MetricsLayer {
    sink: Arc<dyn MetricsSink>,
}

impl MetricsLayer {
    #[must_use]
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            sink: Arc::clone(&self.sink),
        }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

/// Service wrapper that times each dispatch and reports it to the sink.
#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    sink: Arc<dyn MetricsSink>,
}

impl<S> Service<Dispatch> for MetricsService<S>
where
    S: Service<Dispatch, Response = Option<Response>, Error = DispatchError> + Send,
    S::Future: Send + 'static,
{
    type Response = Option<Response>;
    type Error = DispatchError;
    type Future = Pin<Box<dyn Future<Output = Result<Option<Response>, DispatchError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, dispatch: Dispatch) -> Self::Future {
        let destination = dispatch.destination.clone();
        let resource = dispatch.resource.clone();
        let method = dispatch.request.method;
        let branch = dispatch.branch().as_str();
        let sink = Arc::clone(&self.sink);

        let span = info_span!(
            "dispatch",
            destination = %destination,
            resource = %resource,
            method = %method,
            branch = branch,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let start = Instant::now();
        let fut = self.inner.call(dispatch);

        Box::pin(
            async move {
                let result = fut.await;
                let duration = start.elapsed();

                let outcome = match &result {
                    Ok(_) => "ok",
                    Err(e) => e.kind(),
                };

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = duration.as_millis() as u64;
                tracing::Span::current().record("duration_ms", duration_ms);
                tracing::Span::current().record("outcome", outcome);

                match &result {
                    Ok(_) => tracing::debug!(duration_ms, outcome, "dispatch complete"),
                    Err(e) => tracing::warn!(duration_ms, outcome, error = %e, "dispatch failed"),
                }

                sink.observe(&Observation {
                    destination,
                    resource,
                    method,
                    duration,
                });

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use courier_core::resource::tags;
    use courier_core::{Destination, Request, RequestMethod};
    use tower::ServiceExt;

    use super::*;
    use crate::context::CallContext;
    use crate::metrics::RecordingSink;
    use crate::traits::TransportError;

    /// Service that answers after a fixed delay, or fails when told to.
    #[derive(Clone)]
    struct FixedService {
        delay_ms: u64,
        fail: bool,
    }

    impl Service<Dispatch> for FixedService {
        type Response = Option<Response>;
        type Error = DispatchError;
        type Future =
            Pin<Box<dyn Future<Output = Result<Option<Response>, DispatchError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, dispatch: Dispatch) -> Self::Future {
            let delay = self.delay_ms;
            let fail = self.fail;
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                if fail {
                    Err(DispatchError::Transport {
                        destination: dispatch.destination.to_string(),
                        method: dispatch.request.method,
                        uri: dispatch.request.uri,
                        source: TransportError::ConnectionLost,
                    })
                } else {
                    Ok(Some(Response::status(200)))
                }
            })
        }
    }

    fn make_dispatch() -> Dispatch {
        Dispatch {
            ctx: CallContext::background(),
            destination: Destination::from("bin-manager.call-manager.request"),
            resource: tags::CALL_CALLS,
            request: Request::new(RequestMethod::Post, "/v1/calls"),
            timeout: Duration::from_secs(3),
            delay: Duration::ZERO,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn records_one_observation_per_call() {
        let sink = Arc::new(RecordingSink::new());
        let svc = MetricsLayer::new(sink.clone()).layer(FixedService {
            delay_ms: 10,
            fail: false,
        });

        let resp = svc.oneshot(make_dispatch()).await.unwrap();
        assert_eq!(resp.unwrap().status_code, 200);

        let observed = sink.observations();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0].destination.as_str(), "bin-manager.call-manager.request");
        assert_eq!(observed[0].resource, tags::CALL_CALLS);
        assert_eq!(observed[0].method, RequestMethod::Post);
        assert_eq!(observed[0].duration, Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_calls_are_observed_and_passed_through() {
        let sink = Arc::new(RecordingSink::new());
        let svc = MetricsLayer::new(sink.clone()).layer(FixedService {
            delay_ms: 5,
            fail: true,
        });

        let err = svc.oneshot(make_dispatch()).await.unwrap_err();
        assert_eq!(err.kind(), "transport");
        assert_eq!(sink.observations().len(), 1);
    }
}
