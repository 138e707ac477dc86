//! chat-server
//!
//! Multi-client async chat relay over TCP and/or UDP.
//!
//! Data flow: a transport receives bytes, `chat-protocol` decodes them,
//! the [`router::Router`] classifies each message by kind, consults or
//! mutates the [`registry::Registry`], and sends replies and broadcasts
//! back out through the participants' transports.

pub mod config;
pub mod error;
pub mod registry;
pub mod router;
pub mod server;
pub mod transport;
pub mod types;

// these are internal modules, not re-exported
mod datagram_task;
mod session;

pub use config::{Config, ConfigError, TransportMode};
pub use error::{RouteError, ServerError, TransportError};
pub use registry::{Participant, Registry};
pub use router::{Outcome, Router};
pub use server::Server;
pub use transport::Transport;
pub use types::{shutdown_channel, AbortOnDrop, ConnectionId, Origin, ShutdownRx, ShutdownTx};
