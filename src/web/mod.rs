//! Websocket front end.
//!
//! Browsers connect here, speak the JSON protocol in `protocol.rs`, and
//! receive `ServerEvent` pushes. Each connection gets an opaque identity;
//! the engine never sees the transport.

pub mod protocol;
mod server;

pub use protocol::ClientCommand;
pub use server::{start_server, ConnectionRegistry};
