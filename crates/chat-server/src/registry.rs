//! Registry of active participants.
//!
//! The registry is the only long-lived state in the relay. It owns the
//! name -> participant map and the one lock protecting it; callers only
//! get atomic operations, never the map itself.
//!
//! Invariants (held under the lock):
//! - at most `capacity` entries,
//! - names are unique,
//! - a datagram address is bound to at most one name.
//!
//! Iteration order is registration order, which is what `LIST_USERS`
//! reports.

use std::sync::Arc;
use std::time::Duration;

use chat_core::{Message, RejectReason};
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::TransportError;
use crate::transport::Transport;
use crate::types::Origin;

/// A registered chat identity bound to a transport origin.
#[derive(Debug, Clone)]
pub struct Participant {
    name: String,
    origin: Origin,
    transport: Arc<dyn Transport>,
    registered_at: Instant,
    last_seen: Instant,
}

impl Participant {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn registered_at(&self) -> Instant {
        self.registered_at
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    /// Send through the participant's transport to its recorded origin.
    pub async fn send(&self, msg: &Message) -> Result<(), TransportError> {
        self.transport.send(&self.origin, msg).await
    }

    /// Ask the transport to stop serving this participant.
    pub fn close(&self) {
        self.transport.close(&self.origin);
    }
}

#[derive(Debug)]
pub struct Registry {
    capacity: usize,
    participants: Mutex<IndexMap<String, Participant>>,
}

impl Registry {
    pub const DEFAULT_CAPACITY: usize = 5;

    pub fn new(capacity: usize) -> Self {
        Registry {
            capacity,
            participants: Mutex::new(IndexMap::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check-then-insert under one lock acquisition.
    ///
    /// Checks run in this order: name taken, origin already bound,
    /// capacity. An existing entry is never modified by a rejection.
    ///
    /// Returns the number of participants right after the insert.
    pub async fn register(
        &self,
        name: &str,
        origin: Origin,
        transport: Arc<dyn Transport>,
    ) -> Result<usize, RejectReason> {
        let mut guard = self.participants.lock().await;

        if guard.contains_key(name) {
            return Err(RejectReason::NameInUse);
        }
        if guard.values().any(|p| p.origin == origin) {
            return Err(RejectReason::AlreadyRegistered);
        }
        if guard.len() >= self.capacity {
            return Err(RejectReason::Full);
        }

        let now = Instant::now();
        guard.insert(
            name.to_string(),
            Participant {
                name: name.to_string(),
                origin,
                transport,
                registered_at: now,
                last_seen: now,
            },
        );
        Ok(guard.len())
    }

    /// Remove by name. Removing an unknown name is a no-op.
    pub async fn remove(&self, name: &str) -> Option<Participant> {
        self.participants.lock().await.shift_remove(name)
    }

    /// Remove `name` only if it is still bound to exactly `origin`.
    ///
    /// Used for teardown and eviction, so that a stale connection or a
    /// stale failed send never removes a newer registration of the same
    /// name.
    pub async fn remove_bound(&self, name: &str, origin: &Origin) -> Option<Participant> {
        let mut guard = self.participants.lock().await;
        match guard.get(name) {
            Some(p) if p.origin == *origin => guard.shift_remove(name),
            _ => None,
        }
    }

    pub async fn lookup(&self, name: &str) -> Option<Participant> {
        self.participants.lock().await.get(name).cloned()
    }

    /// Name bound to `origin`, if any.
    pub async fn name_of(&self, origin: &Origin) -> Option<String> {
        self.participants
            .lock()
            .await
            .values()
            .find(|p| p.origin == *origin)
            .map(|p| p.name.clone())
    }

    /// Names in registration order.
    pub async fn snapshot(&self) -> Vec<String> {
        self.participants.lock().await.keys().cloned().collect()
    }

    /// Authenticate `name` against `origin` and record the activity.
    ///
    /// Returns `false` (and changes nothing) when `name` is not
    /// registered, or when `origin` may not act for it. A datagram
    /// participant's address is refreshed to `origin`, unless that address
    /// belongs to somebody else.
    pub async fn touch(&self, name: &str, origin: &Origin) -> bool {
        let mut guard = self.participants.lock().await;

        let taken = guard
            .values()
            .any(|p| p.name != name && p.origin == *origin);
        if taken {
            return false;
        }

        let Some(p) = guard.get_mut(name) else {
            return false;
        };
        if !origin.may_act_for(&p.origin) {
            return false;
        }
        if p.origin != *origin {
            debug!(name, from = %p.origin, to = %origin, "participant address refreshed");
            p.origin = *origin;
        }
        p.last_seen = Instant::now();
        true
    }

    /// Visit every participant except `excluded`, under the lock.
    ///
    /// `f` must not block; sends belong outside the lock (see
    /// [`Registry::recipients_except`]).
    pub async fn for_each_except<F>(&self, excluded: Option<&str>, mut f: F)
    where
        F: FnMut(&Participant),
    {
        let guard = self.participants.lock().await;
        for p in guard.values() {
            if Some(p.name.as_str()) != excluded {
                f(p);
            }
        }
    }

    /// Point-in-time copy of everyone except `excluded`.
    pub async fn recipients_except(&self, excluded: Option<&str>) -> Vec<Participant> {
        let mut out = Vec::new();
        self.for_each_except(excluded, |p| out.push(p.clone())).await;
        out
    }

    /// Remove datagram participants silent for longer than `max_idle`.
    ///
    /// Stream participants are never expired here: their liveness is the
    /// connection itself.
    pub async fn remove_idle(&self, max_idle: Duration) -> Vec<Participant> {
        let now = Instant::now();
        let mut guard = self.participants.lock().await;
        let mut expired = Vec::new();
        guard.retain(|_, p| {
            let idle = p.origin.is_datagram() && now.duration_since(p.last_seen) > max_idle;
            if idle {
                expired.push(p.clone());
            }
            !idle
        });
        expired
    }

    /// Empty the registry, returning everybody that was in it.
    pub async fn drain(&self) -> Vec<Participant> {
        self.participants
            .lock()
            .await
            .drain(..)
            .map(|(_, p)| p)
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.participants.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.participants.lock().await.is_empty()
    }
}
