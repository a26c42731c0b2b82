//! Courier Core: broker request/response envelopes, destination resolution and resource tags.

pub mod destination;
pub mod envelope;
pub mod resource;

pub use destination::{Destination, DestinationTable, ServiceName, UnknownService};
pub use envelope::{CodecError, Request, RequestMethod, Response};
pub use resource::ResourceTag;
