//! Innermost service: hands a dispatch to the broker transport.
//!
//! Chooses between the RPC primitive and the delayed-publish primitive and
//! wraps transport failures with the call's destination, method and URI. Makes
//! exactly one transport attempt per call.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use courier_core::Response;
use tower::Service;
use tracing::debug;

use crate::dispatch::call::{Dispatch, DispatchError};
use crate::traits::BrokerTransport;

/// Service that performs the transport call for a [`Dispatch`].
#[derive(Clone)]
pub struct BrokerService {
    transport: Arc<dyn BrokerTransport>,
    delay_exchange: Arc<str>,
}

impl BrokerService {
    #[must_use]
    pub fn new(transport: Arc<dyn BrokerTransport>, delay_exchange: &str) -> Self {
        Self {
            transport,
            delay_exchange: Arc::from(delay_exchange),
        }
    }
}

impl Service<Dispatch> for BrokerService {
    type Response = Option<Response>;
    type Error = DispatchError;
    type Future = Pin<Box<dyn Future<Output = Result<Option<Response>, DispatchError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, dispatch: Dispatch) -> Self::Future {
        let transport = Arc::clone(&self.transport);
        let delay_exchange = Arc::clone(&self.delay_exchange);

        Box::pin(async move {
            let Dispatch {
                destination,
                request,
                delay,
                ..
            } = dispatch;

            if delay.is_zero() {
                debug!(
                    destination = %destination,
                    method = %request.method,
                    uri = %request.uri,
                    data_type = %request.content_type,
                    "sending request"
                );
                match transport.publish_rpc(&destination, &request).await {
                    Ok(res) => {
                        debug!(
                            destination = %destination,
                            method = %request.method,
                            uri = %request.uri,
                            status_code = res.status_code,
                            "received result"
                        );
                        Ok(Some(res))
                    }
                    Err(source) => Err(DispatchError::Transport {
                        destination: destination.to_string(),
                        method: request.method,
                        uri: request.uri,
                        source,
                    }),
                }
            } else {
                // Scheduled message: there is no reply to wait for.
                debug!(
                    destination = %destination,
                    exchange = %delay_exchange,
                    method = %request.method,
                    uri = %request.uri,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "sending delayed request"
                );
                transport
                    .publish_delayed(&delay_exchange, &destination, &request, delay)
                    .await
                    .map(|()| None)
                    .map_err(|source| DispatchError::Enqueue {
                        destination: destination.to_string(),
                        method: request.method,
                        uri: request.uri,
                        source,
                    })
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
