//! Transport abstraction.
//!
//! Two variants with the same capability set:
//!
//! - [`stream`]: one TCP connection per participant, length-prefixed
//!   frames, a writer task per connection.
//! - [`datagram`]: one UDP socket for everybody, one message per
//!   datagram, participants identified by source address.
//!
//! The router only ever sees the sending half, through [`Transport`].
//! Receiving is driven by the supervisors (`session` and
//! `datagram_task`), because the two variants differ exactly there.

pub mod datagram;
pub mod stream;

use std::fmt;

use async_trait::async_trait;
use chat_core::Message;

use crate::error::TransportError;
use crate::types::Origin;

pub use datagram::DatagramTransport;
pub use stream::{StreamConnection, StreamLink, StreamListener, StreamReader, StreamSettings};

/// Sending half of a transport.
///
/// Sends are best-effort and bounded in time. An error means the target
/// should be treated as unreachable; it never affects other targets.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Deliver one message to `target`.
    async fn send(&self, target: &Origin, msg: &Message) -> Result<(), TransportError>;

    /// Stop serving `target`. Closes a stream connection; a no-op for
    /// datagram peers, which have nothing to close.
    fn close(&self, target: &Origin);
}
