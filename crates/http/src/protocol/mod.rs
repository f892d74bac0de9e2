//! Request/response types shared by the codec, the connection and handlers.
//!
//! - [`RequestHead`]: the parsed request line and header fields, with header
//!   names kept in the case they were received
//! - [`HttpRequest`]: a head plus the fully buffered body and the peer address
//! - [`HttpResponse`]: status, ordered header fields and a body
//! - [`Message`]: what the decoder yields, first the head then the body
//! - [`HttpError`], [`ParseError`], [`SendError`]: error types

mod message;
pub use message::Message;
pub use message::PayloadSize;

mod request;
pub use request::HeaderField;
pub use request::HttpRequest;
pub use request::RequestHead;

mod response;
pub use response::HttpResponse;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
