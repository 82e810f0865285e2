//! Transport boundary for the multiplexer.
//!
//! The pool never touches a socket directly: it sends through the
//! [`Transport`] trait and consumes [`TransportEvent`]s from a channel.
//! `websocket` is the production implementation; `inmem` is an in-process
//! implementation used by tests.

mod core;
mod error;
mod inmem;
mod types;
mod websocket;

pub use self::core::Transport;
pub use error::{Result, TransportError};
pub use inmem::InMemoryTransport;
pub use types::{ConnectionId, TransportEvent};
pub use websocket::WebSocketTransport;
