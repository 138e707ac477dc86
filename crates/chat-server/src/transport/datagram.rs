//! UDP side of the relay.
//!
//! One bound socket serves every datagram participant. There is no
//! connection object: a participant is its last known source address,
//! refreshed by the registry on every accepted datagram.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use chat_core::Message;
use chat_protocol::{decode_datagram, encode_datagram, CodecError};
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::error::TransportError;
use crate::transport::Transport;
use crate::types::Origin;

#[derive(Debug)]
pub struct DatagramTransport {
    socket: UdpSocket,
    send_timeout: Duration,
}

impl DatagramTransport {
    pub async fn bind(addr: &str, send_timeout: Duration) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(DatagramTransport {
            socket,
            send_timeout,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive one datagram into `buf`.
    ///
    /// The outer error is a socket failure; the inner one is a malformed
    /// packet, which the caller drops.
    pub async fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> Result<(Result<Message, CodecError>, SocketAddr), TransportError> {
        let (len, from) = self.socket.recv_from(buf).await?;
        Ok((decode_datagram(&buf[..len]), from))
    }

    /// Best-effort send to one address.
    pub async fn send_to(&self, addr: SocketAddr, msg: &Message) -> Result<(), TransportError> {
        let payload = encode_datagram(msg)?;
        match timeout(self.send_timeout, self.socket.send_to(&payload, addr)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(TransportError::Timeout(self.send_timeout)),
        }
    }
}

#[async_trait]
impl Transport for DatagramTransport {
    async fn send(&self, target: &Origin, msg: &Message) -> Result<(), TransportError> {
        match target {
            Origin::Datagram(addr) => self.send_to(*addr, msg).await,
            other => Err(TransportError::WrongTarget(*other)),
        }
    }

    fn close(&self, _target: &Origin) {}
}
