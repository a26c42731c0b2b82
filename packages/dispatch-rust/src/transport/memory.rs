//! In-process broker.
//!
//! Consumers register an async handler per destination. Envelopes cross the
//! broker in their encoded wire form, so codec failures show up as transport
//! errors just as they would against a real broker. An RPC to a destination
//! nobody consumes is never answered.

use std::future::{pending, Future};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_core::{Destination, Request, Response};
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use tracing::{debug, trace, warn};

use crate::traits::{BrokerTransport, TransportError};

type Handler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Broker living in the current process, for wiring services together
/// without a network hop and for tests.
pub struct MemoryBroker {
    handlers: Arc<DashMap<String, Handler>>,
    closed: AtomicBool,
    rpc_published: AtomicU64,
    delayed_published: AtomicU64,
}

impl MemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(DashMap::new()),
            closed: AtomicBool::new(false),
            rpc_published: AtomicU64::new(0),
            delayed_published: AtomicU64::new(0),
        }
    }

    /// Install the consumer for `destination`, replacing any previous one.
    pub fn register<F, Fut>(&self, destination: impl Into<String>, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let handler: Handler =
            Arc::new(move |req| -> BoxFuture<'static, Response> { Box::pin(handler(req)) });
        self.handlers.insert(destination.into(), handler);
    }

    /// Remove the consumer for `destination`. Later RPCs to it go unanswered.
    pub fn unregister(&self, destination: &str) {
        self.handlers.remove(destination);
    }

    /// Simulate a lost connection: every later publish fails.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    /// Number of RPC requests accepted so far.
    #[must_use]
    pub fn rpc_published(&self) -> u64 {
        self.rpc_published.load(Ordering::Relaxed)
    }

    /// Number of delayed requests accepted so far.
    #[must_use]
    pub fn delayed_published(&self) -> u64 {
        self.delayed_published.load(Ordering::Relaxed)
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Relaxed) {
            Err(TransportError::ConnectionLost)
        } else {
            Ok(())
        }
    }

    fn handler(handlers: &DashMap<String, Handler>, destination: &str) -> Option<Handler> {
        handlers.get(destination).map(|entry| Arc::clone(entry.value()))
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerTransport for MemoryBroker {
    async fn publish_rpc(
        &self,
        destination: &Destination,
        request: &Request,
    ) -> Result<Response, TransportError> {
        self.ensure_open()?;
        let wire = request.encode()?;
        self.rpc_published.fetch_add(1, Ordering::Relaxed);

        let Some(handler) = Self::handler(&self.handlers, destination.as_str()) else {
            trace!(destination = %destination, "no consumer, request stays unanswered");
            return pending().await;
        };

        let reply = handler(Request::decode(&wire)?).await;
        Ok(Response::decode(&reply.encode()?)?)
    }

    async fn publish_delayed(
        &self,
        delay_exchange: &str,
        destination: &Destination,
        request: &Request,
        delay: Duration,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        let wire = request.encode()?;
        self.delayed_published.fetch_add(1, Ordering::Relaxed);

        let handlers = Arc::clone(&self.handlers);
        let destination = destination.to_string();
        let exchange = delay_exchange.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let Some(handler) = Self::handler(&handlers, &destination) else {
                warn!(destination = %destination, exchange = %exchange, "delayed request dropped: no consumer");
                return;
            };
            match Request::decode(&wire) {
                Ok(req) => {
                    let res = handler(req).await;
                    debug!(
                        destination = %destination,
                        status_code = res.status_code,
                        "delayed request delivered"
                    );
                }
                Err(e) => warn!(destination = %destination, error = %e, "delayed request dropped: undecodable"),
            }
        });

        Ok(())
    }
}
