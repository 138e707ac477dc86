//! In-memory transport for router and registry tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chat_core::{Message, MessageKind};
use chat_protocol::CodecError;
use chat_server::{ConnectionId, Origin, Transport, TransportError};

/// Records every message sent through it. Can be switched to fail, to
/// refuse every message as too large, or to behave like a real link
/// (yield on each send, refuse sends once closed).
#[derive(Debug, Default)]
pub struct RecordingTransport {
    inbox: Mutex<Vec<Message>>,
    failing: AtomicBool,
    oversized: AtomicBool,
    yielding: AtomicBool,
    closed: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let t = Self::new();
        t.set_failing(true);
        t
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_oversized(&self, oversized: bool) {
        self.oversized.store(oversized, Ordering::SeqCst);
    }

    pub fn yielding() -> Arc<Self> {
        let t = Self::new();
        t.yielding.store(true, Ordering::SeqCst);
        t
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Everything received so far, clearing the inbox.
    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.inbox.lock().unwrap())
    }

    pub fn is_empty(&self) -> bool {
        self.inbox.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, _target: &Origin, msg: &Message) -> Result<(), TransportError> {
        if self.yielding.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
            if self.is_closed() {
                return Err(TransportError::Closed);
            }
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        if self.oversized.load(Ordering::SeqCst) {
            return Err(TransportError::Codec(CodecError::TooLarge {
                len: 70_000,
                max: 65_507,
            }));
        }
        self.inbox.lock().unwrap().push(msg.clone());
        Ok(())
    }

    fn close(&self, _target: &Origin) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn stream(id: u64) -> Origin {
    Origin::Stream(ConnectionId(id))
}

pub fn datagram(addr: &str) -> Origin {
    let addr: SocketAddr = addr.parse().unwrap();
    Origin::Datagram(addr)
}

/// (kind, sender, content) triples, for compact assertions.
pub fn summary(msgs: &[Message]) -> Vec<(&'static str, String, String)> {
    msgs.iter()
        .map(|m| (m.kind().name(), m.sender().to_string(), m.content().to_string()))
        .collect()
}

pub fn notice(content: &str) -> (&'static str, String, String) {
    (
        MessageKind::ServerNotice.name(),
        "SERVER".to_string(),
        content.to_string(),
    )
}
