//! The two ways requests reach a [`Router`](crate::Router).
//!
//! - [`socket`]: adapts the router to the `stagemux-http` connection loop
//! - [`invocation`]: reads proxy events from an [`InvocationHost`] and writes
//!   back JSON responses
//!
//! Both normalize into a [`CanonicalRequest`](crate::CanonicalRequest) and
//! serialize from a [`CanonicalResponse`](crate::CanonicalResponse).

pub mod invocation;
pub mod socket;
pub(crate) mod template;

pub use invocation::InvocationHost;
pub use invocation::ProxyRequestEvent;
pub use invocation::StdioHost;
pub use socket::SocketService;
pub use template::render_resource;
