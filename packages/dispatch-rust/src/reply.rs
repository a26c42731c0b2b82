//! Interpreting dispatch replies on the caller side.
//!
//! The dispatcher leaves status codes and "no reply" to its callers. These
//! helpers cover the patterns the request wrappers repeat: decode a JSON body,
//! accept a call that may have been scheduled, and the opt-in policy of
//! treating a timeout as "not found".

use courier_core::Response;
use serde::de::DeserializeOwned;

use crate::dispatch::DispatchResult;

/// Why a reply could not be turned into a value.
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("no response")]
    NoResponse,
    #[error("response code: {status_code}")]
    Status { status_code: u16 },
    #[error("could not decode the response body: {0}")]
    Decode(#[from] serde_json::Error),
}

fn check_status(res: &Response) -> Result<(), ReplyError> {
    if res.status_code > 299 {
        Err(ReplyError::Status {
            status_code: res.status_code,
        })
    } else {
        Ok(())
    }
}

/// Decode the JSON body of a successful reply.
///
/// # Errors
///
/// [`ReplyError::NoResponse`] for a missing reply, [`ReplyError::Status`] for
/// status codes above 299, [`ReplyError::Decode`] for a body that is not `T`.
pub fn decode_json<T: DeserializeOwned>(reply: Option<Response>) -> Result<T, ReplyError> {
    let res = reply.ok_or(ReplyError::NoResponse)?;
    check_status(&res)?;
    Ok(res.decode_body()?)
}

/// Accept a reply whose body is not needed.
///
/// A missing reply is fine here: it is what a delayed send returns.
///
/// # Errors
///
/// [`ReplyError::Status`] for status codes above 299.
pub fn expect_accepted(reply: Option<&Response>) -> Result<(), ReplyError> {
    match reply {
        None => Ok(()),
        Some(res) => check_status(res),
    }
}

/// Turn a timed-out dispatch into a 404 reply. Other outcomes pass through.
///
/// # Errors
///
/// Every dispatch error except [`Timeout`](crate::dispatch::DispatchError::Timeout).
pub fn timeout_as_not_found(result: DispatchResult) -> DispatchResult {
    match result {
        Err(e) if e.is_timeout() => Ok(Some(Response::status(404))),
        other => other,
    }
}
