//! The single datagram receive loop.
//!
//! UDP has no connections to supervise: every packet is decoded and
//! handed to the router on its own, and liveness is approximated by the
//! idle expiry that runs on the housekeeping tick.

use std::sync::Arc;
use std::time::Duration;

use chat_core::MessageKind;
use chat_protocol::wire_types::MAX_DATAGRAM_LEN;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::router::Router;
use crate::transport::{DatagramTransport, Transport};
use crate::types::{wait_until_set, Origin, ShutdownRx};

const HOUSEKEEPING_PERIOD: Duration = Duration::from_secs(1);

pub(crate) async fn run_datagram_loop(
    socket: Arc<DatagramTransport>,
    router: Arc<Router>,
    idle_timeout: Option<Duration>,
    mut shutdown: ShutdownRx,
) {
    let transport: Arc<dyn Transport> = socket.clone();
    let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
    let mut housekeeping = interval(HOUSEKEEPING_PERIOD);
    housekeeping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let received = tokio::select! {
            _ = wait_until_set(&mut shutdown) => break,
            _ = housekeeping.tick() => {
                if let Some(max_idle) = idle_timeout {
                    router.expire_idle(max_idle).await;
                }
                continue;
            }
            res = socket.recv_from(&mut buf) => res,
        };

        let (decoded, from) = match received {
            Ok(packet) => packet,
            Err(e) => {
                // ICMP port-unreachable from an old send surfaces here on
                // some platforms; the socket itself is still usable.
                warn!(error = %e, "datagram receive failed");
                continue;
            }
        };

        let msg = match decoded {
            Ok(msg) => msg,
            Err(e) => {
                debug!(%from, error = %e, "dropping malformed datagram");
                continue;
            }
        };

        let origin = Origin::Datagram(from);
        if matches!(msg.kind(), MessageKind::Register) {
            // The router already answered the requester either way.
            let _ = router
                .register(msg.sender(), origin, transport.clone())
                .await;
        } else {
            router.dispatch(&origin, msg).await;
        }
    }

    info!("datagram loop stopped");
}
