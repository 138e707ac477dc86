//! Listener wiring and top-level server lifecycle.
//!
//! This module:
//! - Binds the stream listener and/or the datagram socket.
//! - Accepts connections and assigns each a `ConnectionId`.
//! - Spawns:
//!   - a supervisor task per stream connection,
//!   - the single datagram receive loop.
//! - On shutdown, notifies every participant and waits (bounded) for the
//!   tasks to finish.
//!
//! Per-connection logic lives in `session`, the datagram loop in
//! `datagram_task`, and routing in `router`.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::datagram_task::run_datagram_loop;
use crate::error::ServerError;
use crate::registry::Registry;
use crate::router::Router;
use crate::session::supervise;
use crate::transport::{DatagramTransport, StreamConnection, StreamListener};
use crate::types::{shutdown_channel, wait_until_set, ConnectionId, ShutdownRx, ShutdownTx};

/// Process-wide counter for assigning unique `ConnectionId`s.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

fn next_connection_id() -> ConnectionId {
    ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
}

/// How long `run` waits for tasks to wind down after shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A bound, not yet running relay.
#[derive(Debug)]
pub struct Server {
    config: Config,
    router: Arc<Router>,
    listener: Option<StreamListener>,
    datagram: Option<Arc<DatagramTransport>>,
}

impl Server {
    /// Validate `config` and bind every socket its transport mode needs.
    ///
    /// In `both` mode the datagram socket takes the stream listener's
    /// actual port, so port 0 still yields one shared port number.
    pub async fn bind(config: Config) -> Result<Self, ServerError> {
        config.validate()?;

        let listener = if config.transport.uses_stream() {
            let addr = config.socket_addr_string();
            let listener = StreamListener::bind(&addr)
                .await
                .map_err(|source| ServerError::Bind { addr, source })?;
            Some(listener)
        } else {
            None
        };

        let datagram = if config.transport.uses_datagram() {
            let port = match &listener {
                Some(l) => l.local_addr()?.port(),
                None => config.port,
            };
            let addr = format!("{}:{}", config.bind_addr, port);
            let socket = DatagramTransport::bind(&addr, config.send_timeout)
                .await
                .map_err(|source| ServerError::Bind { addr, source })?;
            Some(Arc::new(socket))
        } else {
            None
        };

        let registry = Arc::new(Registry::new(config.max_clients));
        let router = Arc::new(Router::new(registry));

        Ok(Server {
            config,
            router,
            listener,
            datagram,
        })
    }

    pub fn stream_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    pub fn datagram_addr(&self) -> Option<SocketAddr> {
        self.datagram.as_ref().and_then(|d| d.local_addr().ok())
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serve until `shutdown` flips.
    ///
    /// Tasks are stopped through a second, internal signal that is only
    /// raised after every participant got the shutdown notice.
    pub async fn run(self, mut shutdown: ShutdownRx) -> Result<(), ServerError> {
        let Server {
            config,
            router,
            listener,
            datagram,
        } = self;

        info!(
            transport = %config.transport,
            max_clients = config.max_clients,
            "chat server starting"
        );

        let (stop_tx, stop_rx): (ShutdownTx, ShutdownRx) = shutdown_channel();
        let mut tasks = JoinSet::new();

        if let Some(socket) = datagram {
            info!(addr = %socket.local_addr()?, "listening (udp)");
            tasks.spawn(run_datagram_loop(
                socket,
                router.clone(),
                config.idle_timeout,
                stop_rx.clone(),
            ));
        }

        match listener {
            Some(listener) => {
                info!(addr = %listener.local_addr()?, "listening (tcp)");
                accept_loop(&listener, &config, &router, &mut tasks, &mut shutdown, &stop_rx).await;
            }
            None => wait_until_set(&mut shutdown).await,
        }

        info!("shutting down");
        router.shutdown().await;
        stop_tx.send_replace(true);

        let drained = timeout(SHUTDOWN_GRACE, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(remaining = tasks.len(), "tasks still running after grace period, aborting");
            tasks.abort_all();
        }

        info!("chat server stopped");
        Ok(())
    }
}

async fn accept_loop(
    listener: &StreamListener,
    config: &Config,
    router: &Arc<Router>,
    tasks: &mut JoinSet<()>,
    shutdown: &mut ShutdownRx,
    stop: &ShutdownRx,
) {
    let settings = config.stream_settings();

    loop {
        // Reap finished supervisors so the set does not grow unbounded.
        while let Some(res) = tasks.try_join_next() {
            if let Err(e) = res {
                error!(error = %e, "task failed");
            }
        }

        let accepted = tokio::select! {
            _ = wait_until_set(shutdown) => return,
            res = listener.accept() => res,
        };

        let (stream, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                if is_transient(&e) {
                    debug!(error = %e, "accept failed");
                } else {
                    warn!(error = %e, "accept failed");
                }
                sleep(Duration::from_millis(50)).await;
                continue;
            }
        };

        let id = next_connection_id();
        info!(connection = %id, %peer, "accepted connection");

        let conn = StreamConnection::open(stream, id, peer, &settings);
        tasks.spawn(supervise(
            conn,
            router.clone(),
            config.register_timeout,
            stop.clone(),
        ));
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset | io::ErrorKind::Interrupted
    )
}
