//! Client against a scripted in-test server.

use std::time::Duration;

use chat_client::{ChatClient, ClientConfig, ClientError, Protocol};
use chat_core::{Message, MessageKind, RejectReason};
use chat_protocol::{decode_datagram, encode_datagram, frame, FrameDecoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::time::timeout;

async fn read_one(stream: &mut TcpStream, decoder: &mut FrameDecoder) -> Option<Message> {
    loop {
        if let Some(msg) = decoder.next_message().unwrap() {
            return Some(msg);
        }
        if stream.read_buf(decoder.buffer_mut()).await.unwrap() == 0 {
            return None;
        }
    }
}

async fn tcp_server() -> (TcpListener, ClientConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, ClientConfig::new("127.0.0.1", port, Protocol::Tcp))
}

#[tokio::test]
async fn tcp_register_send_receive_close() {
    let (listener, config) = tcp_server().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut decoder = FrameDecoder::new();

        let register = read_one(&mut stream, &mut decoder).await.unwrap();
        assert_eq!(register.kind(), &MessageKind::Register);
        assert_eq!(register.sender(), "alice");

        // unrelated traffic before the verdict is skipped by register()
        stream
            .write_all(&frame(&Message::server_notice("noise")).unwrap())
            .await
            .unwrap();
        stream
            .write_all(&frame(&Message::register_ok("Welcome alice! 1 users connected.")).unwrap())
            .await
            .unwrap();

        let said = read_one(&mut stream, &mut decoder).await.unwrap();
        stream
            .write_all(&frame(&Message::broadcast("bob", "echo")).unwrap())
            .await
            .unwrap();

        let bye = read_one(&mut stream, &mut decoder).await.unwrap();
        let eof = read_one(&mut stream, &mut decoder).await;
        (said, bye, eof)
    });

    let mut client = ChatClient::connect(config).await.unwrap();
    let welcome = client.register("alice").await.unwrap();
    assert_eq!(welcome, "Welcome alice! 1 users connected.");
    assert_eq!(client.name(), Some("alice"));

    client.send(&Message::broadcast("alice", "hi")).await.unwrap();
    let got = client.receive().await.unwrap().unwrap();
    assert_eq!(got.sender(), "bob");
    client.close().await.unwrap();

    let (said, bye, eof) = server.await.unwrap();
    assert_eq!(said.content(), "hi");
    assert_eq!(bye.kind(), &MessageKind::Disconnect);
    assert_eq!(bye.sender(), "alice");
    assert!(eof.is_none());
}

#[tokio::test]
async fn tcp_rejection_is_reported() {
    let (listener, config) = tcp_server().await;

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut decoder = FrameDecoder::new();
        read_one(&mut stream, &mut decoder).await.unwrap();
        stream
            .write_all(&frame(&Message::register_fail(RejectReason::NameInUse)).unwrap())
            .await
            .unwrap();
    });

    let mut client = ChatClient::connect(config).await.unwrap();
    match client.register("alice").await {
        Err(ClientError::Rejected(reason)) => assert_eq!(reason, RejectReason::NameInUse),
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(client.name(), None);
}

#[tokio::test]
async fn tcp_receive_reports_clean_close() {
    let (listener, config) = tcp_server().await;
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let mut client = ChatClient::connect(config).await.unwrap();
    assert!(client.receive().await.unwrap().is_none());
}

#[tokio::test]
async fn connect_to_nothing_fails() {
    let (listener, config) = tcp_server().await;
    drop(listener);

    match ChatClient::connect(config).await {
        Err(ClientError::Connect { .. }) => {}
        other => panic!("expected connect error, got {other:?}"),
    }
}

#[tokio::test]
async fn udp_skips_malformed_datagrams() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = server.local_addr().unwrap().port();
    let mut client = ChatClient::connect(ClientConfig::new("127.0.0.1", port, Protocol::Udp))
        .await
        .unwrap();

    client.send(&Message::register("alice")).await.unwrap();

    let mut buf = vec![0u8; 2048];
    let (len, from) = server.recv_from(&mut buf).await.unwrap();
    let register = decode_datagram(&buf[..len]).unwrap();
    assert_eq!(register.sender(), "alice");

    server.send_to(b"not json", from).await.unwrap();
    server
        .send_to(&encode_datagram(&Message::server_notice("hello")).unwrap(), from)
        .await
        .unwrap();

    let got = timeout(Duration::from_secs(2), client.receive())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(got.content(), "hello");
}

#[test]
fn protocol_names_parse() {
    assert_eq!("TCP".parse::<Protocol>().unwrap(), Protocol::Tcp);
    assert_eq!("udp".parse::<Protocol>().unwrap(), Protocol::Udp);
    assert!("sctp".parse::<Protocol>().is_err());
}
