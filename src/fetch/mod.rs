//! Request/response model and the transport seam
//!
//! Requests and responses carry one-shot bodies. Whatever must be read more
//! than once (matched and forwarded, stored and returned) is duplicated
//! before the first read.

pub mod body;
pub mod request;
pub mod response;
pub mod transport;

pub use body::Body;
pub use request::{origin_of, resolve_url, Headers, Request, RequestKey};
pub use response::{Response, ResponseType, Served};
pub use transport::{HttpTransport, Transport};
