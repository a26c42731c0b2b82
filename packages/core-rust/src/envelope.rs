//! Request/response envelopes exchanged with the broker.
//!
//! Field names follow the broker wire contract (`data_type`, `data`, ...).
//! Bodies are opaque bytes, normally already-serialized JSON. Encoding to the
//! wire uses `MsgPack` via `rmp_serde::to_vec_named()`.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Content type for requests without a body.
pub const CONTENT_TYPE_NONE: &str = "";
/// Plain-text body.
pub const CONTENT_TYPE_TEXT: &str = "text/plain";
/// JSON body.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Timeout used by callers that have no specific budget.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(3000);

/// Send immediately as an RPC.
pub const DELAY_NOW: Duration = Duration::ZERO;
pub const DELAY_SECOND: Duration = Duration::from_secs(1);
pub const DELAY_MINUTE: Duration = Duration::from_secs(60);
pub const DELAY_HOUR: Duration = Duration::from_secs(60 * 60);

// ---------------------------------------------------------------------------
// RequestMethod
// ---------------------------------------------------------------------------

/// HTTP-shaped verb carried by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl RequestMethod {
    /// Upper-case wire name, also used as the metrics label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A request sent to a backend service through the broker.
///
/// `uri` is an opaque path plus query string; callers percent-encode query
/// parameters themselves. The body is only meaningful when `content_type` is
/// non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub uri: String,
    pub method: RequestMethod,
    /// Service identity of the sender. Stamped by the dispatcher.
    #[serde(default)]
    pub publisher: String,
    #[serde(rename = "data_type", default)]
    pub content_type: String,
    #[serde(
        rename = "data",
        default,
        with = "serde_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Creates a body-less request.
    #[must_use]
    pub fn new(method: RequestMethod, uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            method,
            publisher: String::new(),
            content_type: CONTENT_TYPE_NONE.to_string(),
            body: None,
        }
    }

    /// Attaches a body with the given content type.
    ///
    /// An empty content type drops the body, since receivers ignore it anyway.
    #[must_use]
    pub fn with_body(mut self, content_type: impl Into<String>, body: Vec<u8>) -> Self {
        self.content_type = content_type.into();
        self.body = if self.content_type.is_empty() {
            None
        } else {
            Some(body)
        };
        self
    }

    /// Serializes `payload` as JSON and attaches it with `application/json`.
    ///
    /// # Errors
    ///
    /// Returns an error if `payload` cannot be serialized.
    pub fn with_json<T: Serialize>(self, payload: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(payload)?;
        Ok(self.with_body(CONTENT_TYPE_JSON, body))
    }

    /// Returns the body when the content type says there is one.
    #[must_use]
    pub fn payload(&self) -> Option<&[u8]> {
        if self.content_type.is_empty() {
            None
        } else {
            self.body.as_deref()
        }
    }

    /// Encodes the request for the wire.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decodes a request received from the wire.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] if the bytes are not a valid request.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// A reply from a backend service.
///
/// A status code of 400 or above is an application-level error and is still a
/// successful response as far as the dispatch layer is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status_code: u16,
    #[serde(rename = "data_type", default)]
    pub content_type: String,
    #[serde(rename = "data", default, with = "serde_bytes")]
    pub body: Vec<u8>,
}

impl Response {
    /// Response with a status code and no body.
    #[must_use]
    pub fn status(status_code: u16) -> Self {
        Self {
            status_code,
            content_type: CONTENT_TYPE_NONE.to_string(),
            body: Vec::new(),
        }
    }

    /// Response carrying a JSON body.
    #[must_use]
    pub fn json(status_code: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code,
            content_type: CONTENT_TYPE_JSON.to_string(),
            body: body.into(),
        }
    }

    /// `true` for 2xx status codes.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON for `T`.
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Encodes the response for the wire.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decodes a response received from the wire.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] if the bytes are not a valid response.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

// ---------------------------------------------------------------------------
// CodecError
// ---------------------------------------------------------------------------

/// Failure to move an envelope to or from its wire form.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("envelope encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("envelope decode failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_wire_names_are_upper_case() {
        let json = serde_json::to_string(&RequestMethod::Delete).unwrap();
        assert_eq!(json, "\"DELETE\"");
        assert_eq!(RequestMethod::Post.to_string(), "POST");
    }

    #[test]
    fn request_uses_wire_field_names() {
        let req = Request::new(RequestMethod::Post, "/v1/calls")
            .with_body(CONTENT_TYPE_JSON, br#"{"a":1}"#.to_vec());
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["uri"], "/v1/calls");
        assert_eq!(value["method"], "POST");
        assert_eq!(value["data_type"], "application/json");
        assert!(value.get("data").is_some());
        assert!(value.get("content_type").is_none());
    }

    #[test]
    fn empty_content_type_drops_body() {
        let req = Request::new(RequestMethod::Put, "/v1/x").with_body(CONTENT_TYPE_NONE, vec![1, 2]);
        assert!(req.body.is_none());
        assert!(req.payload().is_none());
    }

    #[test]
    fn with_json_sets_content_type() {
        #[derive(Serialize)]
        struct Data {
            retry_count: u32,
        }

        let req = Request::new(RequestMethod::Post, "/v1/calls/1/health-check")
            .with_json(&Data { retry_count: 2 })
            .unwrap();
        assert_eq!(req.content_type, CONTENT_TYPE_JSON);
        assert_eq!(req.payload(), Some(br#"{"retry_count":2}"#.as_slice()));
    }

    #[test]
    fn request_survives_wire_encoding() {
        let mut req = Request::new(RequestMethod::Get, "/v1/queues?page_size=10");
        req.publisher = "call-manager".to_string();

        let decoded = Request::decode(&req.encode().unwrap()).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn response_decode_rejects_garbage() {
        let err = Response::decode(&[0xc1, 0x00]).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn response_success_range() {
        assert!(Response::status(200).is_success());
        assert!(Response::status(204).is_success());
        assert!(!Response::status(300).is_success());
        assert!(!Response::status(404).is_success());
    }

    #[test]
    fn response_decodes_json_body() {
        #[derive(Deserialize)]
        struct Item {
            id: String,
        }

        let res = Response::json(200, br#"{"id":"1"}"#.to_vec());
        let item: Item = res.decode_body().unwrap();
        assert_eq!(item.id, "1");
    }

    #[test]
    fn delay_units() {
        assert_eq!(DELAY_NOW, Duration::ZERO);
        assert_eq!(DELAY_MINUTE, DELAY_SECOND * 60);
        assert_eq!(DELAY_HOUR, DELAY_MINUTE * 60);
        assert_eq!(DEFAULT_REQUEST_TIMEOUT.as_millis(), 3000);
    }
}
