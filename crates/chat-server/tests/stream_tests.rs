//! A real loopback connection behind `StreamLink`.

use std::time::Duration;

use chat_core::Message;
use chat_protocol::FrameDecoder;
use chat_server::transport::{StreamConnection, StreamListener, StreamSettings};
use chat_server::{ConnectionId, Origin, Transport, TransportError};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(3);

async fn pair() -> (StreamConnection, TcpStream) {
    let listener = StreamListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).await.unwrap();
    let (stream, peer) = listener.accept().await.unwrap();
    let conn = StreamConnection::open(stream, ConnectionId(1), peer, &StreamSettings::default());
    (conn, client)
}

async fn read_all(client: &mut TcpStream) -> Vec<Message> {
    let mut decoder = FrameDecoder::new();
    let mut seen = Vec::new();
    loop {
        while let Some(msg) = decoder.next_message().unwrap() {
            seen.push(msg);
        }
        let n = timeout(WAIT, client.read_buf(decoder.buffer_mut()))
            .await
            .unwrap()
            .unwrap();
        if n == 0 {
            return seen;
        }
    }
}

#[tokio::test]
async fn shut_down_link_refuses_sends_but_flushes_queued_frames() {
    let (conn, mut client) = pair().await;
    let link = conn.link.clone();

    link.send_message(&Message::server_notice("before")).await.unwrap();
    link.shutdown();
    assert!(link.is_closed());
    assert!(matches!(
        link.send_message(&Message::server_notice("after")).await,
        Err(TransportError::Closed)
    ));

    timeout(WAIT, conn.writer).await.unwrap().unwrap();
    let seen = read_all(&mut client).await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].content(), "before");
}

#[tokio::test]
async fn oversized_frame_fails_the_message_not_the_link() {
    let (conn, mut client) = pair().await;
    let link = conn.link.clone();

    let err = link
        .send_message(&Message::server_notice("x".repeat(70_000)))
        .await
        .unwrap_err();
    assert!(err.is_message_error(), "{err:?}");
    assert!(!link.is_closed());

    link.send_message(&Message::server_notice("small")).await.unwrap();
    link.shutdown();
    timeout(WAIT, conn.writer).await.unwrap().unwrap();
    let seen = read_all(&mut client).await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].content(), "small");
}

#[tokio::test]
async fn link_only_serves_its_own_connection() {
    let (conn, _client) = pair().await;
    let other = Origin::Stream(ConnectionId(2));

    let err = conn
        .link
        .send(&other, &Message::server_notice("hi"))
        .await
        .unwrap_err();
    assert!(matches!(&err, TransportError::WrongTarget(o) if *o == other));
    assert!(!err.is_message_error());
    assert!(
        !TransportError::Timeout(Duration::from_millis(1)).is_message_error()
            && !TransportError::Closed.is_message_error()
    );
}
