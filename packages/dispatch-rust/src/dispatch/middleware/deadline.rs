//! Deadline middleware for dispatches.
//!
//! Derives the bounded sub-context of each call and races the inner service
//! against it. Direct sends are bounded by `min(caller deadline, now + timeout)`;
//! delayed sends only by the caller's own context. Caller cancellation always
//! wins. When the sub-context finishes first the inner future is dropped,
//! abandoning the in-flight transport call.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use courier_core::{RequestMethod, Response};
use tower::{Layer, Service};

use crate::context::Done;
use crate::dispatch::call::{Branch, Dispatch, DispatchError};

// ---------------------------------------------------------------------------
// DeadlineLayer
// ---------------------------------------------------------------------------

/// Tower layer that wraps services with per-dispatch deadline enforcement.
///
/// The timeout is read from each dispatch's `timeout` field and composed with
/// the caller's [`CallContext`](crate::context::CallContext).
#[derive(Debug, Clone)]
pub struct DeadlineLayer;

impl<S> Layer<S> for DeadlineLayer {
    type Service = DeadlineService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DeadlineService { inner }
    }
}

// ---------------------------------------------------------------------------
// DeadlineService
// ---------------------------------------------------------------------------

/// Service wrapper that enforces the bounded sub-context of each dispatch.
#[derive(Debug, Clone)]
pub struct DeadlineService<S> {
    inner: S,
}

impl<S> Service<Dispatch> for DeadlineService<S>
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
        let bounded = match dispatch.branch() {
            Branch::Direct => dispatch.ctx.with_timeout(dispatch.timeout),
            Branch::Delayed => dispatch.ctx.child(),
        };
        let budget_ms = bounded
            .remaining()
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        let finished = Finished {
            destination: dispatch.destination.to_string(),
            method: dispatch.request.method,
            uri: dispatch.request.uri.clone(),
            budget_ms,
        };

        // Already cancelled or past the caller's deadline: never reach the transport.
        if let Some(done) = bounded.err() {
            return Box::pin(async move { Err(finished.into_error(done)) });
        }

        let fut = self.inner.call(dispatch);
        Box::pin(async move {
            tokio::select! {
                biased;
                done = bounded.done() => Err(finished.into_error(done)),
                result = fut => result,
            }
        })
    }
}

/// Call details kept aside to build the error if the sub-context finishes first.
struct Finished {
    destination: String,
    method: RequestMethod,
    uri: String,
    budget_ms: u64,
}

impl Finished {
    fn into_error(self, done: Done) -> DispatchError {
        match done {
            Done::Cancelled => DispatchError::Cancelled {
                destination: self.destination,
                method: self.method,
                uri: self.uri,
            },
            Done::DeadlineExceeded => DispatchError::Timeout {
                destination: self.destination,
                method: self.method,
                uri: self.uri,
                timeout_ms: self.budget_ms,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use courier_core::{Destination, Request, ResourceTag};
    use tokio::time::Instant;
    use tower::ServiceExt;

    use super::*;
    use crate::context::CallContext;

    /// Sets a flag when dropped, to observe abandoned inner futures.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Service that takes a configurable delay before responding.
    #[derive(Clone)]
    struct SlowService {
        delay_ms: u64,
        calls: Arc<AtomicU32>,
        dropped: Arc<AtomicBool>,
    }

    impl SlowService {
        fn new(delay_ms: u64) -> Self {
            Self {
                delay_ms,
                calls: Arc::new(AtomicU32::new(0)),
                dropped: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl Service<Dispatch> for SlowService {
        type Response = Option<Response>;
        type Error = DispatchError;
        type Future =
            Pin<Box<dyn Future<Output = Result<Option<Response>, DispatchError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _dispatch: Dispatch) -> Self::Future {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.delay_ms;
            let guard = DropFlag(Arc::clone(&self.dropped));
            Box::pin(async move {
                let _guard = guard;
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(Some(Response::status(200)))
            })
        }
    }

    fn make_dispatch(ctx: CallContext, timeout_ms: u64, delay_ms: u64) -> Dispatch {
        Dispatch {
            ctx,
            destination: Destination::from("svc-a"),
            resource: ResourceTag::NONE,
            request: Request::new(RequestMethod::Get, "/v1/items"),
            timeout: Duration::from_millis(timeout_ms),
            delay: Duration::from_millis(delay_ms),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completes_within_timeout() {
        let svc = DeadlineLayer.layer(SlowService::new(10));
        let resp = svc
            .oneshot(make_dispatch(CallContext::background(), 1000, 0))
            .await
            .unwrap();
        assert_eq!(resp.unwrap().status_code, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn exceeds_timeout_returns_error_and_drops_inner() {
        let inner = SlowService::new(10_000);
        let dropped = Arc::clone(&inner.dropped);
        let svc = DeadlineLayer.layer(inner);

        let start = Instant::now();
        let err = svc
            .oneshot(make_dispatch(CallContext::background(), 100, 0))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Timeout { timeout_ms: 100, .. }));
        assert_eq!(start.elapsed(), Duration::from_millis(100));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn caller_deadline_wins_over_longer_timeout() {
        let ctx = CallContext::background().with_timeout(Duration::from_millis(50));
        let svc = DeadlineLayer.layer(SlowService::new(10_000));

        let start = Instant::now();
        let err = svc.oneshot(make_dispatch(ctx, 5000, 0)).await.unwrap_err();

        assert!(matches!(err, DispatchError::Timeout { timeout_ms: 50, .. }));
        assert_eq!(start.elapsed(), Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_context_skips_inner_service() {
        let inner = SlowService::new(10);
        let calls = Arc::clone(&inner.calls);
        let ctx = CallContext::background();
        ctx.cancel();

        let err = DeadlineLayer
            .layer(inner)
            .oneshot(make_dispatch(ctx, 1000, 0))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_mid_flight_returns_promptly() {
        let ctx = CallContext::background();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let err = DeadlineLayer
            .layer(SlowService::new(10_000))
            .oneshot(make_dispatch(ctx, 5000, 0))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(start.elapsed(), Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_send_ignores_local_timeout() {
        // The inner service stands in for a slow enqueue; a zero timeout must not cut it short.
        let svc = DeadlineLayer.layer(SlowService::new(30));
        let resp = svc
            .oneshot(make_dispatch(CallContext::background(), 0, 2000))
            .await
            .unwrap();
        assert!(resp.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_send_still_honours_caller_cancellation() {
        let ctx = CallContext::background();
        ctx.cancel();

        let err = DeadlineLayer
            .layer(SlowService::new(10))
            .oneshot(make_dispatch(ctx, 1000, 2000))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
