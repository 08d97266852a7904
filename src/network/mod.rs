//! Connection-side building blocks.
//!
//! Once the acceptor has established a connection it steps out of the
//! picture; everything a dispatched service needs lives here:
//!
//! - `ServiceStream`: the plain-vs-TLS socket handed to a service
//! - `EchoService`: a reference service used by the demo binary and tests

pub use echo::EchoService;
pub use stream::ServiceStream;

mod echo;
mod stream;
