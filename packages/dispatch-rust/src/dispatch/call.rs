//! Dispatch parameters and the errors a dispatch can end with.

use std::time::Duration;

use courier_core::{Destination, Request, RequestMethod, ResourceTag, Response};

use crate::context::CallContext;
use crate::traits::TransportError;

/// Everything needed to execute one remote call. Built per call, consumed once.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub ctx: CallContext,
    pub destination: Destination,
    pub resource: ResourceTag,
    pub request: Request,
    /// Upper bound on the RPC wait. Ignored by delayed sends.
    pub timeout: Duration,
    /// Zero sends now as an RPC; anything else schedules a delayed publish.
    pub delay: Duration,
}

/// Which transport primitive a dispatch uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Direct,
    Delayed,
}

impl Branch {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Delayed => "delayed",
        }
    }
}

impl Dispatch {
    #[must_use]
    pub fn branch(&self) -> Branch {
        if self.delay.is_zero() {
            Branch::Direct
        } else {
            Branch::Delayed
        }
    }

    /// Checks the input constraints that do not depend on the transport.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidRequest`] for an empty URI or a zero
    /// timeout on the direct branch.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.request.uri.is_empty() {
            return Err(self.invalid("uri must not be empty"));
        }
        if self.branch() == Branch::Direct && self.timeout.is_zero() {
            return Err(self.invalid("timeout must be positive when sending without delay"));
        }
        Ok(())
    }

    fn invalid(&self, reason: &'static str) -> DispatchError {
        DispatchError::InvalidRequest {
            destination: self.destination.to_string(),
            reason,
        }
    }
}

/// Result of a completed dispatch.
///
/// `Ok(None)` only happens on the delayed branch: the broker accepted the
/// message and there is no synchronous reply. A response with an error status
/// is still `Ok(Some(_))`; interpreting status codes is up to the caller.
pub type DispatchResult = Result<Option<Response>, DispatchError>;

/// Why a dispatch did not complete.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid request for {destination}: {reason}")]
    InvalidRequest {
        destination: String,
        reason: &'static str,
    },
    #[error("request cancelled by caller. destination: {destination}, method: {method}, uri: {uri}")]
    Cancelled {
        destination: String,
        method: RequestMethod,
        uri: String,
    },
    #[error("no response within {timeout_ms}ms. destination: {destination}, method: {method}, uri: {uri}")]
    Timeout {
        destination: String,
        method: RequestMethod,
        uri: String,
        timeout_ms: u64,
    },
    #[error("could not send the request. destination: {destination}, method: {method}, uri: {uri}")]
    Transport {
        destination: String,
        method: RequestMethod,
        uri: String,
        #[source]
        source: TransportError,
    },
    #[error("could not send the delayed request. destination: {destination}, method: {method}, uri: {uri}")]
    Enqueue {
        destination: String,
        method: RequestMethod,
        uri: String,
        #[source]
        source: TransportError,
    },
}

impl DispatchError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Label for logs and span fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Cancelled { .. } => "cancelled",
            Self::Timeout { .. } => "timeout",
            Self::Transport { .. } => "transport",
            Self::Enqueue { .. } => "enqueue",
        }
    }
}
