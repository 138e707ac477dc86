//! Stream connection supervisor.
//!
//! One task per accepted connection:
//! 1. wait (bounded) for REGISTER,
//! 2. feed every decoded frame to the router until EOF, a protocol
//!    error, DISCONNECT, a closed link or shutdown,
//! 3. tear the participant down, whatever happened in between.

use std::sync::Arc;
use std::time::Duration;

use chat_core::{Message, MessageKind};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::router::{Outcome, Router};
use crate::transport::{StreamConnection, StreamLink, StreamReader, Transport};
use crate::types::{wait_until_set, AbortOnDrop, ShutdownRx};

/// Run one connection to completion.
///
/// The session itself runs in its own task so that even a panic inside
/// it still unregisters the participant and closes the socket. That task
/// is aborted if this one is.
pub(crate) async fn supervise(
    conn: StreamConnection,
    router: Arc<Router>,
    register_timeout: Duration,
    shutdown: ShutdownRx,
) {
    let link = conn.link.clone();
    let origin = link.origin();

    let session = AbortOnDrop::new(tokio::spawn(run_session(
        conn,
        router.clone(),
        register_timeout,
        shutdown,
    )));
    if let Err(e) = session.await {
        error!(%origin, peer = %link.peer(), error = %e, "session task failed");
        router.disconnect_origin(&origin).await;
        link.shutdown();
    }
}

async fn run_session(
    conn: StreamConnection,
    router: Arc<Router>,
    register_timeout: Duration,
    mut shutdown: ShutdownRx,
) {
    let StreamConnection {
        link,
        mut reader,
        writer,
    } = conn;
    let origin = link.origin();

    let name = handshake(&link, &mut reader, &router, register_timeout, &mut shutdown).await;

    if let Some(name) = name {
        serve(&link, &mut reader, &router, &name, &mut shutdown).await;
        router.disconnect(&name, &origin).await;
    }

    finish(&link, writer).await;
}

/// First message must be a REGISTER, within `register_timeout`.
///
/// Returns the registered name, or `None` if the connection should close.
async fn handshake(
    link: &Arc<StreamLink>,
    reader: &mut StreamReader,
    router: &Router,
    register_timeout: Duration,
    shutdown: &mut ShutdownRx,
) -> Option<String> {
    let origin = link.origin();

    let first = tokio::select! {
        res = timeout(register_timeout, reader.recv()) => res,
        _ = wait_until_set(shutdown) => return None,
    };

    let msg = match first {
        Ok(Ok(Some(msg))) => msg,
        Ok(Ok(None)) => {
            debug!(%origin, "closed before registering");
            return None;
        }
        Ok(Err(e)) => {
            warn!(%origin, peer = %link.peer(), error = %e, "protocol error before registering");
            let _ = link.send_message(&Message::error(e.to_string())).await;
            return None;
        }
        Err(_) => {
            info!(%origin, peer = %link.peer(), ?register_timeout, "no REGISTER in time, closing");
            return None;
        }
    };

    if !matches!(msg.kind(), MessageKind::Register) {
        warn!(%origin, kind = msg.kind().name(), "first message was not REGISTER");
        let _ = link
            .send_message(&Message::error("first message must be REGISTER"))
            .await;
        return None;
    }

    let transport: Arc<dyn Transport> = link.clone();
    match router.register(msg.sender(), origin, transport).await {
        Ok(()) => Some(msg.sender().to_string()),
        Err(_) => None,
    }
}

async fn serve(
    link: &StreamLink,
    reader: &mut StreamReader,
    router: &Router,
    name: &str,
    shutdown: &mut ShutdownRx,
) {
    let origin = link.origin();
    let mut closed = link.closed();

    loop {
        let next = tokio::select! {
            res = reader.recv() => res,
            _ = wait_until_set(&mut closed) => {
                debug!(name, %origin, "link closed");
                return;
            }
            _ = wait_until_set(shutdown) => return,
        };

        match next {
            Ok(Some(msg)) => {
                if router.dispatch(&origin, msg).await == Outcome::Close {
                    return;
                }
            }
            Ok(None) => {
                info!(name, %origin, "connection closed by peer");
                return;
            }
            Err(e) => {
                warn!(name, %origin, error = %e, "protocol error, closing connection");
                let _ = link.send_message(&Message::error(e.to_string())).await;
                return;
            }
        }
    }
}

/// Close the link and give the writer a bounded chance to flush.
async fn finish(link: &StreamLink, mut writer: JoinHandle<()>) {
    link.shutdown();
    let grace = link.send_timeout() * 2;
    if timeout(grace, &mut writer).await.is_err() {
        debug!(connection = %link.id(), "writer did not finish in time, aborting");
        writer.abort();
    }
}
