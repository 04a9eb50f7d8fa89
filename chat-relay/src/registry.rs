use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::names::random_display_name;

pub type ConnectionId = u64;

/// Text frames queued for a connection's writer task.
pub type Outbox = mpsc::UnboundedSender<String>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("connection {id} is no longer writable")]
pub struct TransportFault {
    pub id: ConnectionId,
}

/// Transport side of a connection: its identity and the queue its writer
/// task drains.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    outbox: Outbox,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, peer: Option<SocketAddr>, outbox: Outbox) -> Self {
        Self { id, peer, outbox }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn send(&self, text: impl Into<String>) -> Result<(), TransportFault> {
        self.outbox
            .send(text.into())
            .map_err(|_| TransportFault { id: self.id })
    }
}

/// A live session as the registry sees it.
#[derive(Debug, Clone)]
pub struct Connection {
    pub handle: ConnectionHandle,
    pub name: String,
    pub opened_at: DateTime<Local>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: Vec<ConnectionId>,
}

/// The live set of connections, keyed by connection id.
#[derive(Debug)]
pub struct Registry {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Registry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn next_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    // Never held across an await. Every mutation is a single insert or
    // remove, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Connection>> {
        self.connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds the connection under a freshly generated display name.
    pub fn register(self: &Arc<Self>, handle: ConnectionHandle) -> Membership {
        self.register_as(handle, random_display_name())
    }

    pub fn register_as(self: &Arc<Self>, handle: ConnectionHandle, name: String) -> Membership {
        let connection = Connection {
            handle: handle.clone(),
            name: name.clone(),
            opened_at: Local::now(),
        };
        self.lock().insert(handle.id, connection);
        info!(id = handle.id, peer = ?handle.peer, %name, "client connects");

        Membership {
            registry: Arc::clone(self),
            handle,
            name,
        }
    }

    /// Removes the connection if it is still registered.
    pub fn unregister(&self, id: ConnectionId) -> Option<Connection> {
        let removed = self.lock().remove(&id);
        if let Some(connection) = &removed {
            info!(
                id,
                peer = ?connection.handle.peer,
                name = %connection.name,
                "client disconnects"
            );
        }
        removed
    }

    /// Queues `message` for every registered connection. Recipients whose
    /// outbox is gone are skipped and unregistered once the pass is over.
    pub fn broadcast(&self, message: &str) -> BroadcastReport {
        let mut connections = self.lock();
        let mut report = BroadcastReport::default();

        for (id, connection) in connections.iter() {
            match connection.handle.send(message) {
                Ok(()) => report.delivered += 1,
                Err(fault) => {
                    warn!(id, name = %connection.name, error = %fault, "broadcast delivery failed");
                    report.failed.push(*id);
                }
            }
        }

        for id in &report.failed {
            if let Some(connection) = connections.remove(id) {
                info!(id, name = %connection.name, "client disconnects");
            }
        }

        report
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn display_name(&self, id: ConnectionId) -> Option<String> {
        self.lock().get(&id).map(|connection| connection.name.clone())
    }

    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Proof of registration. The display name is fixed for the lifetime of the
/// membership, and dropping it removes the connection from the registry.
#[derive(Debug)]
pub struct Membership {
    registry: Arc<Registry>,
    handle: ConnectionHandle,
    name: String,
}

impl Membership {
    pub fn id(&self) -> ConnectionId {
        self.handle.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.handle.peer
    }

    /// Sends `text` to this connection only.
    pub fn reply(&self, text: impl Into<String>) -> Result<(), TransportFault> {
        self.handle.send(text)
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        self.registry.unregister(self.handle.id);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn handle(registry: &Registry) -> (ConnectionHandle, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(registry.next_id(), None, tx), rx)
    }

    #[test]
    fn register_assigns_a_name_and_tracks_the_connection() {
        let registry = Registry::new();
        let (handle, _rx) = handle(&registry);

        let member = registry.register(handle);

        assert!(!member.name().is_empty());
        assert!(registry.contains(member.id()));
        assert_eq!(registry.display_name(member.id()).as_deref(), Some(member.name()));
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = Registry::new();
        let (handle, _rx) = handle(&registry);
        let member = registry.register_as(handle, "alice".into());
        let id = member.id();

        assert!(registry.unregister(id).is_some());
        assert!(registry.unregister(id).is_none());
        assert!(registry.unregister(9_999).is_none());
        drop(member);
        assert!(registry.is_empty());
    }

    #[test]
    fn dropping_the_membership_unregisters() {
        let registry = Registry::new();
        let (handle, _rx) = handle(&registry);
        let member = registry.register(handle);
        let id = member.id();

        drop(member);

        assert!(!registry.contains(id));
    }

    #[test]
    fn broadcast_skips_failed_recipients_and_reaches_the_rest() {
        let registry = Registry::new();
        let (alice, mut alice_rx) = handle(&registry);
        let (bob, bob_rx) = handle(&registry);
        let (carol, mut carol_rx) = handle(&registry);
        let _alice = registry.register_as(alice, "alice".into());
        let bob = registry.register_as(bob, "bob".into());
        let _carol = registry.register_as(carol, "carol".into());
        drop(bob_rx);

        let report = registry.broadcast("hello");

        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, vec![bob.id()]);
        assert_eq!(alice_rx.try_recv().as_deref(), Ok("hello"));
        assert_eq!(carol_rx.try_recv().as_deref(), Ok("hello"));
        assert!(!registry.contains(bob.id()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn broadcasts_from_one_sender_arrive_in_order() {
        let registry = Registry::new();
        let (alice, mut alice_rx) = handle(&registry);
        let _alice = registry.register_as(alice, "alice".into());

        for n in 0..5 {
            registry.broadcast(&format!("message {n}"));
        }

        let received: Vec<String> = std::iter::from_fn(|| alice_rx.try_recv().ok()).collect();
        let expected: Vec<String> = (0..5).map(|n| format!("message {n}")).collect();
        assert_eq!(received, expected);
    }

    #[test]
    fn reply_reaches_only_the_member() {
        let registry = Registry::new();
        let (alice, mut alice_rx) = handle(&registry);
        let (bob, mut bob_rx) = handle(&registry);
        let alice = registry.register_as(alice, "alice".into());
        let _bob = registry.register_as(bob, "bob".into());

        alice.reply("just for you").expect("alice is writable");

        assert_eq!(alice_rx.try_recv().as_deref(), Ok("just for you"));
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_leave_exactly_the_survivors() {
        let registry = Registry::new();
        let mut tasks = Vec::new();

        for n in 0..64u64 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let (tx, rx) = mpsc::unbounded_channel();
                let member = registry.register(ConnectionHandle::new(registry.next_id(), None, tx));
                registry.broadcast("tick");
                tokio::task::yield_now().await;
                if n % 3 == 0 {
                    drop(member);
                    None
                } else {
                    Some((member, rx))
                }
            }));
        }

        let mut survivors = Vec::new();
        for task in tasks {
            if let Some(kept) = task.await.expect("task panicked") {
                survivors.push(kept);
            }
        }

        let expected: BTreeSet<ConnectionId> =
            survivors.iter().map(|(member, _)| member.id()).collect();
        let live: BTreeSet<ConnectionId> = registry.ids().into_iter().collect();
        assert_eq!(live, expected);
    }
}
