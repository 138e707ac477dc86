//! TCP side of the relay.
//!
//! Each accepted connection is split in two:
//! - a [`StreamReader`] owned by the connection's supervisor, which
//!   decodes length-prefixed frames,
//! - a writer task fed through a bounded channel by the connection's
//!   [`StreamLink`], which is what the registry stores.
//!
//! Closing the link lets the writer flush whatever is already queued,
//! then shuts the socket down and wakes the supervisor.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chat_core::Message;
use chat_protocol::wire_types::MAX_FRAME_LEN;
use chat_protocol::{frame, FrameDecoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::transport::Transport;
use crate::types::{wait_until_set, ConnectionId, Origin};

/// Per-connection knobs.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub max_frame_len: usize,
    pub send_timeout: Duration,
    pub outbound_queue: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        StreamSettings {
            max_frame_len: MAX_FRAME_LEN,
            send_timeout: Duration::from_secs(2),
            outbound_queue: 64,
        }
    }
}

/// Listening socket.
#[derive(Debug)]
pub struct StreamListener {
    listener: TcpListener,
}

impl StreamListener {
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(StreamListener { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.listener.accept().await
    }
}

/// An accepted connection, split into its reading and sending halves.
#[derive(Debug)]
pub struct StreamConnection {
    pub link: Arc<StreamLink>,
    pub reader: StreamReader,
    pub writer: JoinHandle<()>,
}

impl StreamConnection {
    /// Split `stream` and spawn its writer task.
    pub fn open(
        stream: TcpStream,
        id: ConnectionId,
        peer: SocketAddr,
        settings: &StreamSettings,
    ) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(connection = %id, error = %e, "set_nodelay failed");
        }

        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::channel(settings.outbound_queue);
        let (closed, _) = watch::channel(false);

        let link = Arc::new(StreamLink {
            id,
            peer,
            tx,
            send_timeout: settings.send_timeout,
            closed,
        });

        let writer = tokio::spawn(run_writer(link.clone(), write_half, rx));

        StreamConnection {
            link,
            reader: StreamReader {
                read: read_half,
                decoder: FrameDecoder::with_max_frame_len(settings.max_frame_len),
            },
            writer,
        }
    }
}

/// Sending handle for one connection.
#[derive(Debug)]
pub struct StreamLink {
    id: ConnectionId,
    peer: SocketAddr,
    tx: mpsc::Sender<Bytes>,
    send_timeout: Duration,
    closed: watch::Sender<bool>,
}

impl StreamLink {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn origin(&self) -> Origin {
        Origin::Stream(self.id)
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Watch that flips to `true` once the connection is closing.
    pub fn closed(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Queue one frame for the writer task, waiting at most
    /// `send_timeout` for room in the queue.
    pub async fn send_message(&self, msg: &Message) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let bytes = frame(msg)?;
        self.tx
            .send_timeout(bytes, self.send_timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => TransportError::Timeout(self.send_timeout),
                SendTimeoutError::Closed(_) => TransportError::Closed,
            })
    }

    /// Start closing: queued frames are still flushed.
    pub fn shutdown(&self) {
        self.closed.send_replace(true);
    }
}

#[async_trait]
impl Transport for StreamLink {
    async fn send(&self, target: &Origin, msg: &Message) -> Result<(), TransportError> {
        if *target != self.origin() {
            return Err(TransportError::WrongTarget(*target));
        }
        self.send_message(msg).await
    }

    fn close(&self, _target: &Origin) {
        self.shutdown();
    }
}

/// Reading half of a connection.
#[derive(Debug)]
pub struct StreamReader {
    read: OwnedReadHalf,
    decoder: FrameDecoder,
}

impl StreamReader {
    /// Next complete message. `Ok(None)` on a clean end-of-stream.
    ///
    /// Cancel safe: bytes already read stay in the decoder buffer.
    pub async fn recv(&mut self) -> Result<Option<Message>, TransportError> {
        loop {
            if let Some(msg) = self.decoder.next_message()? {
                return Ok(Some(msg));
            }

            let n = self.read.read_buf(self.decoder.buffer_mut()).await?;
            if n == 0 {
                self.decoder.finish()?;
                return Ok(None);
            }
        }
    }
}

/// Writer task: drain the outbound queue into the socket.
async fn run_writer(link: Arc<StreamLink>, mut write: OwnedWriteHalf, mut rx: mpsc::Receiver<Bytes>) {
    let mut closed = link.closed();
    let mut closing = false;

    loop {
        let frame = if closing {
            match rx.try_recv() {
                Ok(frame) => frame,
                Err(_) => break,
            }
        } else {
            tokio::select! {
                biased;
                frame = rx.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
                _ = wait_until_set(&mut closed) => {
                    closing = true;
                    continue;
                }
            }
        };

        match timeout(link.send_timeout, write.write_all(&frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(connection = %link.id, error = %e, "write failed");
                link.shutdown();
                break;
            }
            Err(_) => {
                warn!(connection = %link.id, peer = %link.peer, "write timed out");
                link.shutdown();
                break;
            }
        }
    }

    let _ = timeout(link.send_timeout, write.shutdown()).await;
    debug!(connection = %link.id, "writer finished");
}
