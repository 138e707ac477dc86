//! Connection to the relay.
//!
//! TCP carries length-prefixed JSON frames; UDP carries one JSON payload
//! per datagram over a socket connected to the server, so only the
//! server's packets are received.

use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use chat_core::{Message, MessageKind};
use chat_protocol::wire_types::{DEFAULT_PORT, MAX_DATAGRAM_LEN, MAX_FRAME_LEN};
use chat_protocol::{decode_datagram, encode_datagram, encode_frame, FrameDecoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Udp => f.write_str("udp"),
        }
    }
}

impl FromStr for Protocol {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            other => Err(ClientError::UnknownProtocol(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub max_frame_len: usize,
    /// How long `register` waits for REGISTER_OK / REGISTER_FAIL.
    pub reply_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            protocol: Protocol::Tcp,
            max_frame_len: MAX_FRAME_LEN,
            reply_timeout: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        ClientConfig {
            host: host.into(),
            port,
            protocol,
            ..ClientConfig::default()
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A connected (TCP) or bound-and-connected (UDP) chat session.
#[derive(Debug)]
pub struct ChatClient {
    sender: ClientSender,
    receiver: ClientReceiver,
    reply_timeout: Duration,
    name: Option<String>,
}

impl ChatClient {
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let addr = config.server_addr();

        let (sender, receiver) = match config.protocol {
            Protocol::Tcp => {
                let stream = TcpStream::connect(&addr)
                    .await
                    .map_err(|source| ClientError::Connect {
                        addr: addr.clone(),
                        source,
                    })?;
                stream.set_nodelay(true)?;
                let (read, write) = stream.into_split();
                (
                    ClientSender::stream(write),
                    ClientReceiver::stream(read, config.max_frame_len),
                )
            }
            Protocol::Udp => {
                let socket = Arc::new(connect_datagram(&addr).await?);
                (
                    ClientSender::datagram(socket.clone()),
                    ClientReceiver::datagram(socket),
                )
            }
        };

        info!(%addr, protocol = %config.protocol, "connected");
        Ok(ChatClient {
            sender,
            receiver,
            reply_timeout: config.reply_timeout,
            name: None,
        })
    }

    /// Registered name, once `register` succeeded.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub async fn send(&mut self, msg: &Message) -> Result<(), ClientError> {
        self.sender.send(msg).await
    }

    /// Next message from the server; `None` once a stream is closed.
    pub async fn receive(&mut self) -> Result<Option<Message>, ClientError> {
        self.receiver.receive().await
    }

    /// Send REGISTER and wait for the verdict.
    ///
    /// Returns the welcome text of REGISTER_OK.
    pub async fn register(&mut self, name: &str) -> Result<String, ClientError> {
        self.send(&Message::register(name)).await?;
        let deadline = Instant::now() + self.reply_timeout;

        loop {
            let reply = timeout_at(deadline, self.receiver.receive())
                .await
                .map_err(|_| ClientError::Timeout("registration reply"))??;
            let Some(msg) = reply else {
                return Err(ClientError::Closed);
            };

            match msg.kind() {
                MessageKind::RegisterOk => {
                    self.name = Some(name.to_string());
                    return Ok(msg.content().to_string());
                }
                MessageKind::RegisterFail => {
                    return Err(match msg.reject_reason() {
                        Some(reason) => ClientError::Rejected(reason),
                        None => ClientError::Server(msg.content().to_string()),
                    });
                }
                MessageKind::Error => return Err(ClientError::Server(msg.content().to_string())),
                other => debug!(kind = other.name(), "skipping message while registering"),
            }
        }
    }

    /// Leave: DISCONNECT (best effort, only when registered), then close
    /// the sending side.
    pub async fn close(mut self) -> Result<(), ClientError> {
        if let Some(name) = self.name.take() {
            if let Err(e) = self.sender.send(&Message::disconnect(name)).await {
                debug!(error = %e, "DISCONNECT not sent");
            }
        }
        self.sender.shutdown().await
    }

    /// Split into halves that can live in different tasks.
    pub fn into_split(self) -> (ClientSender, ClientReceiver) {
        (self.sender, self.receiver)
    }
}

async fn connect_datagram(addr: &str) -> Result<UdpSocket, ClientError> {
    let connect_err = |source: io::Error| ClientError::Connect {
        addr: addr.to_string(),
        source,
    };

    let server = lookup_host(addr)
        .await
        .map_err(connect_err)?
        .next()
        .ok_or_else(|| connect_err(io::Error::new(io::ErrorKind::NotFound, "no address")))?;

    let local = if server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(local).await?;
    socket.connect(server).await?;
    Ok(socket)
}

#[derive(Debug)]
enum SenderInner {
    Stream {
        write: OwnedWriteHalf,
        buf: BytesMut,
    },
    Datagram(Arc<UdpSocket>),
}

/// Sending half of a [`ChatClient`].
#[derive(Debug)]
pub struct ClientSender {
    inner: SenderInner,
}

impl ClientSender {
    fn stream(write: OwnedWriteHalf) -> Self {
        ClientSender {
            inner: SenderInner::Stream {
                write,
                buf: BytesMut::with_capacity(4096),
            },
        }
    }

    fn datagram(socket: Arc<UdpSocket>) -> Self {
        ClientSender {
            inner: SenderInner::Datagram(socket),
        }
    }

    pub async fn send(&mut self, msg: &Message) -> Result<(), ClientError> {
        match &mut self.inner {
            SenderInner::Stream { write, buf } => {
                buf.clear();
                encode_frame(msg, buf)?;
                write.write_all(&buf[..]).await?;
                write.flush().await?;
            }
            SenderInner::Datagram(socket) => {
                let payload = encode_datagram(msg)?;
                socket.send(&payload).await?;
            }
        }
        debug!(kind = msg.kind().name(), "sent");
        Ok(())
    }

    /// Half-close a stream; nothing to do for UDP.
    pub async fn shutdown(&mut self) -> Result<(), ClientError> {
        if let SenderInner::Stream { write, .. } = &mut self.inner {
            write.shutdown().await?;
        }
        Ok(())
    }
}

#[derive(Debug)]
enum ReceiverInner {
    Stream {
        read: OwnedReadHalf,
        decoder: FrameDecoder,
    },
    Datagram {
        socket: Arc<UdpSocket>,
        buf: Vec<u8>,
    },
}

/// Receiving half of a [`ChatClient`].
#[derive(Debug)]
pub struct ClientReceiver {
    inner: ReceiverInner,
}

impl ClientReceiver {
    fn stream(read: OwnedReadHalf, max_frame_len: usize) -> Self {
        ClientReceiver {
            inner: ReceiverInner::Stream {
                read,
                decoder: FrameDecoder::with_max_frame_len(max_frame_len),
            },
        }
    }

    fn datagram(socket: Arc<UdpSocket>) -> Self {
        ClientReceiver {
            inner: ReceiverInner::Datagram {
                socket,
                buf: vec![0u8; MAX_DATAGRAM_LEN],
            },
        }
    }

    /// Next message. Cancel safe.
    ///
    /// Framing violations on a stream are errors; malformed datagrams are
    /// skipped.
    pub async fn receive(&mut self) -> Result<Option<Message>, ClientError> {
        match &mut self.inner {
            ReceiverInner::Stream { read, decoder } => loop {
                if let Some(msg) = decoder.next_message()? {
                    return Ok(Some(msg));
                }
                if read.read_buf(decoder.buffer_mut()).await? == 0 {
                    decoder.finish()?;
                    return Ok(None);
                }
            },
            ReceiverInner::Datagram { socket, buf } => loop {
                let len = socket.recv(buf).await?;
                match decode_datagram(&buf[..len]) {
                    Ok(msg) => return Ok(Some(msg)),
                    Err(e) => debug!(error = %e, "dropping malformed datagram"),
                }
            },
        }
    }
}
