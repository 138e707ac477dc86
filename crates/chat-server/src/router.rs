//! Message routing.
//!
//! Per-participant state machine:
//!
//! ```text
//! Unregistered --REGISTER ok--> Registered --DISCONNECT / close--> Disconnected
//!      |
//!      +--REGISTER rejected--> (never registered)
//! ```
//!
//! Routing policy:
//! - `REGISTER`      => REGISTER_OK / REGISTER_FAIL to the requester,
//!                      "<name> joined" to everybody else.
//! - `BROADCAST`     => everybody except the sender (no echo).
//! - `PRIVATE`       => the recipient, plus the same message back to the
//!                      sender as confirmation; ERROR if no such user.
//! - `LIST_USERS`    => USER_LIST to the sender, sender included.
//! - `DISCONNECT`    => removal, "<name> left" to everybody left.
//!
//! Fan-out takes a point-in-time snapshot of the registry and sends with
//! the lock released, one recipient after another. Each send is bounded
//! by its transport's timeout. A failed send evicts that recipient only,
//! and the eviction is announced like any other departure. A message that
//! cannot be encoded is refused up front and never counts against a
//! recipient.

use std::sync::Arc;
use std::time::Duration;

use chat_core::{validate_name, Message, MessageKind, RejectReason};
use chat_protocol::encode;
use chat_protocol::wire_types::{MAX_DATAGRAM_LEN, MAX_FRAME_LEN};
use tracing::{debug, info, warn};

use crate::error::RouteError;
use crate::registry::{Participant, Registry};
use crate::transport::Transport;
use crate::types::Origin;

/// Largest encoded message the relay forwards between participants. It
/// has to fit both a stream frame and a datagram.
pub const MAX_RELAYED_LEN: usize = if MAX_DATAGRAM_LEN < MAX_FRAME_LEN {
    MAX_DATAGRAM_LEN
} else {
    MAX_FRAME_LEN
};

/// Check that `msg`, as the relay will re-encode it, fits every transport.
pub fn check_relayable(msg: &Message) -> Result<(), RouteError> {
    match encode(msg) {
        Ok(payload) if payload.len() <= MAX_RELAYED_LEN => Ok(()),
        Ok(payload) => Err(RouteError::TooLarge {
            len: payload.len(),
            max: MAX_RELAYED_LEN,
        }),
        Err(e) => Err(RouteError::Unencodable(e.to_string())),
    }
}

/// What a supervisor should do after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// The participant left; a stream supervisor closes the connection.
    Close,
}

#[derive(Debug)]
pub struct Router {
    registry: Arc<Registry>,
}

impl Router {
    pub fn new(registry: Arc<Registry>) -> Self {
        Router { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Registration handshake for `name` arriving from `origin`.
    ///
    /// The requester always gets an answer through `transport`; on
    /// success everybody else is told that `name` joined.
    pub async fn register(
        &self,
        name: &str,
        origin: Origin,
        transport: Arc<dyn Transport>,
    ) -> Result<(), RouteError> {
        let count = match validate_name(name) {
            Ok(()) => self.registry.register(name, origin, transport.clone()).await,
            Err(e) => {
                debug!(name, %origin, error = %e, "invalid name");
                Err(RejectReason::InvalidName)
            }
        };

        let count = match count {
            Ok(count) => count,
            Err(reason) => {
                info!(name, %origin, %reason, "registration rejected");
                if let Err(e) = transport.send(&origin, &Message::register_fail(reason)).await {
                    debug!(name, %origin, error = %e, "could not deliver REGISTER_FAIL");
                }
                return Err(reason.into());
            }
        };
        info!(
            name,
            %origin,
            participants = count,
            capacity = self.registry.capacity(),
            "participant registered"
        );

        let welcome = Message::register_ok(format!("Welcome {name}! {count} users connected."));
        if let Err(e) = transport.send(&origin, &welcome).await {
            warn!(name, %origin, error = %e, "could not deliver REGISTER_OK, dropping");
            if let Some(p) = self.registry.remove_bound(name, &origin).await {
                p.close();
            }
            return Err(RouteError::Unreachable(name.to_string()));
        }

        self.broadcast(&Message::server_notice(format!("{name} joined")), Some(name))
            .await;
        Ok(())
    }

    /// Route one message from a supposedly registered participant.
    ///
    /// The claimed sender must be registered and bound to `origin`;
    /// anything else is ignored.
    pub async fn dispatch(&self, origin: &Origin, msg: Message) -> Outcome {
        let sender = msg.sender();
        if !self.registry.touch(sender, origin).await {
            warn!(
                sender,
                %origin,
                kind = msg.kind().name(),
                "ignoring message: sender not registered from this origin"
            );
            return Outcome::Continue;
        }

        match msg.kind() {
            MessageKind::Broadcast => {
                if let Err(err) = check_relayable(&msg) {
                    warn!(sender, %origin, error = %err, "refusing to relay broadcast");
                    self.reply(sender, &Message::error(err.to_string())).await;
                    return Outcome::Continue;
                }
                info!(sender, content = msg.content(), "broadcast");
                self.broadcast(&msg, Some(sender)).await;
            }
            MessageKind::Private { .. } => {
                if let Err(err) = self.send_private(&msg).await {
                    self.reply(sender, &Message::error(err.to_string())).await;
                }
            }
            MessageKind::ListUsers => {
                let names = self.registry.snapshot().await;
                self.reply(sender, &Message::user_list(&names)).await;
            }
            MessageKind::Disconnect => {
                self.disconnect(sender, origin).await;
                return Outcome::Close;
            }
            MessageKind::Register => {
                self.reply(sender, &Message::error("already registered")).await;
            }
            other => {
                warn!(sender, kind = other.name(), "unexpected message kind from client");
                self.reply(
                    sender,
                    &Message::error(format!("unexpected {} from client", other.name())),
                )
                .await;
            }
        }
        Outcome::Continue
    }

    /// Deliver a PRIVATE message to its recipient and echo it back to the
    /// sender as delivery confirmation.
    pub async fn send_private(&self, msg: &Message) -> Result<(), RouteError> {
        let sender = msg.sender();
        let recipient = msg.recipient().unwrap_or_default();
        check_relayable(msg)?;

        let Some(target) = self.registry.lookup(recipient).await else {
            info!(sender, recipient, "private message to unknown user");
            return Err(RouteError::RecipientNotFound(recipient.to_string()));
        };

        if !self.deliver(&target, msg).await {
            return Err(RouteError::Unreachable(recipient.to_string()));
        }
        info!(sender, recipient, "private message delivered");

        if recipient != sender {
            if let Some(me) = self.registry.lookup(sender).await {
                self.deliver(&me, msg).await;
            }
        }
        Ok(())
    }

    /// Send `msg` to every participant except `except`.
    ///
    /// Returns how many recipients it reached. Recipients whose send
    /// failed are evicted; the broadcast itself never fails.
    pub async fn broadcast(&self, msg: &Message, except: Option<&str>) -> usize {
        let (delivered, failed) = self.fan_out(msg, except).await;
        self.evict(failed).await;
        delivered
    }

    /// Remove `name` if it is still bound to `origin`, and announce it.
    ///
    /// Safe to call more than once: only the call that removes the entry
    /// announces the departure.
    pub async fn disconnect(&self, name: &str, origin: &Origin) -> bool {
        match self.registry.remove_bound(name, origin).await {
            Some(p) => {
                let remaining = self.registry.len().await;
                info!(
                    name,
                    %origin,
                    remaining,
                    connected_for = ?p.registered_at().elapsed(),
                    "participant left"
                );
                self.announce_departures(vec![p]).await;
                true
            }
            None => false,
        }
    }

    /// Disconnect whoever is bound to `origin`, if anybody.
    pub async fn disconnect_origin(&self, origin: &Origin) -> bool {
        match self.registry.name_of(origin).await {
            Some(name) => self.disconnect(&name, origin).await,
            None => false,
        }
    }

    /// Drop datagram participants that have been silent for `max_idle`.
    pub async fn expire_idle(&self, max_idle: Duration) -> usize {
        let expired = self.registry.remove_idle(max_idle).await;
        for p in &expired {
            info!(name = p.name(), origin = %p.origin(), "participant expired (idle)");
        }
        let count = expired.len();
        self.announce_departures(expired).await;
        count
    }

    /// Tell everybody the relay is going away, then empty the registry
    /// and close every participant.
    pub async fn shutdown(&self) {
        self.fan_out(&Message::server_notice("server shutting down"), None)
            .await;
        for p in self.registry.drain().await {
            p.close();
        }
    }

    // -------------------------------------------------------------------------
    // Delivery helpers
    // -------------------------------------------------------------------------

    async fn reply(&self, name: &str, msg: &Message) {
        if let Some(p) = self.registry.lookup(name).await {
            self.deliver(&p, msg).await;
        }
    }

    /// Send to one participant; evict it if it is unreachable.
    async fn deliver(&self, to: &Participant, msg: &Message) -> bool {
        match to.send(msg).await {
            Ok(()) => true,
            Err(e) if e.is_message_error() => {
                warn!(
                    recipient = to.name(),
                    kind = msg.kind().name(),
                    error = %e,
                    "message not encodable, dropped"
                );
                false
            }
            Err(e) => {
                warn!(recipient = to.name(), origin = %to.origin(), error = %e, "delivery failed");
                self.evict(vec![to.clone()]).await;
                false
            }
        }
    }

    /// Sequential sends to a snapshot of the registry, lock released.
    async fn fan_out(&self, msg: &Message, except: Option<&str>) -> (usize, Vec<Participant>) {
        let recipients = self.registry.recipients_except(except).await;
        let mut delivered = 0;
        let mut failed = Vec::new();

        for p in recipients {
            match p.send(msg).await {
                Ok(()) => delivered += 1,
                Err(e) if e.is_message_error() => {
                    warn!(
                        recipient = p.name(),
                        kind = msg.kind().name(),
                        error = %e,
                        "message not encodable, dropped"
                    );
                }
                Err(e) => {
                    warn!(
                        recipient = p.name(),
                        origin = %p.origin(),
                        kind = msg.kind().name(),
                        error = %e,
                        "delivery failed"
                    );
                    failed.push(p);
                }
            }
        }
        (delivered, failed)
    }

    /// Send-failure eviction. Entries that changed since the failed send
    /// (re-registered, address refreshed, already gone) are left alone.
    async fn evict(&self, failed: Vec<Participant>) {
        let mut gone = Vec::new();
        for p in failed {
            if let Some(removed) = self.registry.remove_bound(p.name(), p.origin()).await {
                warn!(name = removed.name(), origin = %removed.origin(), "evicted after failed send");
                gone.push(removed);
            }
        }
        self.announce_departures(gone).await;
    }

    /// Close each departed participant and tell the rest. Announcing can
    /// itself fail to reach someone, who then departs in turn.
    async fn announce_departures(&self, mut gone: Vec<Participant>) {
        while let Some(p) = gone.pop() {
            p.close();
            let notice = Message::server_notice(format!("{} left", p.name()));
            let (_, failed) = self.fan_out(&notice, None).await;
            for f in failed {
                if let Some(removed) = self.registry.remove_bound(f.name(), f.origin()).await {
                    warn!(name = removed.name(), origin = %removed.origin(), "evicted after failed send");
                    gone.push(removed);
                }
            }
        }
    }
}
