use std::time::Duration;

use async_trait::async_trait;
use courier_core::{Destination, Request, RequestMethod, ResourceTag, Response};

/// Broker connection used by the dispatcher.
///
/// Implementations own connection management, acknowledgement, correlation of
/// RPC replies, and any locking needed for concurrent use. One handle is shared
/// by every in-flight call.
///
/// Neither method needs to honour deadlines: the dispatcher drops the returned
/// future when the caller's deadline or cancellation fires.
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    /// Publish a request and wait for the correlated reply.
    async fn publish_rpc(
        &self,
        destination: &Destination,
        request: &Request,
    ) -> Result<Response, TransportError>;

    /// Publish a request to the delay exchange for delivery to `destination`
    /// once `delay` has elapsed. Returns as soon as the broker accepted it.
    async fn publish_delayed(
        &self,
        delay_exchange: &str,
        destination: &Destination,
        request: &Request,
        delay: Duration,
    ) -> Result<(), TransportError>;
}

/// Failure reported by a [`BrokerTransport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("broker connection lost")]
    ConnectionLost,
    #[error("envelope serialization failed: {0}")]
    Serialization(#[from] courier_core::CodecError),
    #[error("broker rejected the message: {reason}")]
    Rejected { reason: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One latency sample for a dispatched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub destination: Destination,
    pub resource: ResourceTag,
    pub method: RequestMethod,
    pub duration: Duration,
}

/// Receives request latency samples.
///
/// `observe` is called inline on the dispatch path, so it must not block and
/// has no way to fail the call.
pub trait MetricsSink: Send + Sync {
    fn observe(&self, observation: &Observation);
}
