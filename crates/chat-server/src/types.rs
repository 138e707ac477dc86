//! Shared types for the chat relay.
//!
//! This module defines:
//! - `ConnectionId`: a lightweight handle for accepted stream connections
//! - `Origin`: where an inbound message came from
//! - the shutdown signal threaded through every loop
//! - `AbortOnDrop`: ties a spawned task's lifetime to its owner

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

/// Identifier for an accepted stream connection.
///
/// This is intentionally opaque; we just guarantee uniqueness
/// over the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Transport-level source of a message, and the binding a registered
/// participant's identity is checked against.
///
/// - Stream: the connection itself.
/// - Datagram: the sender's network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Stream(ConnectionId),
    Datagram(SocketAddr),
}

impl Origin {
    pub fn is_datagram(&self) -> bool {
        matches!(self, Origin::Datagram(_))
    }

    /// Whether traffic arriving from `self` may act for a participant
    /// whose recorded origin is `bound`.
    ///
    /// Datagram peers may change ephemeral port (NAT rebinding), so only
    /// the host has to match; the registry additionally refuses ports that
    /// belong to another participant.
    pub fn may_act_for(&self, bound: &Origin) -> bool {
        match (self, bound) {
            (Origin::Stream(a), Origin::Stream(b)) => a == b,
            (Origin::Datagram(a), Origin::Datagram(b)) => a.ip() == b.ip(),
            _ => false,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Stream(id) => write!(f, "tcp{}", id),
            Origin::Datagram(addr) => write!(f, "udp:{}", addr),
        }
    }
}

/// Shutdown signal: flips to `true` once, observed by every loop.
pub type ShutdownTx = watch::Sender<bool>;
pub type ShutdownRx = watch::Receiver<bool>;

pub fn shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    watch::channel(false)
}

/// Resolve once the flag is set (or its owner is gone). Used for both the
/// shutdown signal and a stream connection's closed flag.
pub(crate) async fn wait_until_set(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|set| *set).await;
}

/// A spawned task that is aborted when this handle is dropped.
///
/// Awaiting it behaves like awaiting the `JoinHandle`. If the awaiting
/// task is itself aborted, the inner task goes down with it.
#[derive(Debug)]
pub struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> AbortOnDrop<T> {
    pub fn new(handle: JoinHandle<T>) -> Self {
        AbortOnDrop(handle)
    }
}

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
