use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

pub mod events;
pub mod handlers;

use events::ServerEvent;

struct Connection {
    connection_id: Uuid,
    tx: UnboundedSender<ServerEvent>,
}

/// Live push connections, one per participant. A new connection for the
/// same participant replaces the previous one. The lock is never held
/// across an await; sends are non-blocking unbounded pushes, so none of
/// these operations suspend.
#[derive(Default, Clone)]
pub struct PresenceRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Connection>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the connection, displacing any previous one for the same
    /// participant, and announces the participant to everyone else.
    /// Returns the handle the connection must present on unregister.
    pub fn register(&self, participant_id: Uuid, tx: UnboundedSender<ServerEvent>) -> Uuid {
        let connection_id = Uuid::new_v4();
        {
            let mut guard = self.inner.write().expect("presence lock poisoned");
            guard.insert(participant_id, Connection { connection_id, tx });
        }
        self.broadcast_except(participant_id, ServerEvent::ParticipantOnline { participant_id });
        connection_id
    }

    /// Removes the mapping only when the stored handle is the caller's own;
    /// a stale disconnect racing a newer connection is a no-op.
    pub fn unregister(&self, participant_id: Uuid, connection_id: Uuid) {
        let removed = {
            let mut guard = self.inner.write().expect("presence lock poisoned");
            match guard.get(&participant_id) {
                Some(conn) if conn.connection_id == connection_id => {
                    guard.remove(&participant_id);
                    true
                }
                _ => false,
            }
        };
        if removed {
            self.broadcast_except(
                participant_id,
                ServerEvent::ParticipantOffline { participant_id },
            );
        }
    }

    /// Absence is a normal outcome, not a failure.
    pub fn lookup(&self, participant_id: Uuid) -> Option<UnboundedSender<ServerEvent>> {
        self.inner
            .read()
            .expect("presence lock poisoned")
            .get(&participant_id)
            .map(|conn| conn.tx.clone())
    }

    /// Pushes an event to a participant's live connection. Returns whether
    /// a connection was there to receive it.
    pub fn push(&self, participant_id: Uuid, event: ServerEvent) -> bool {
        match self.lookup(participant_id) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    fn broadcast_except(&self, skip: Uuid, event: ServerEvent) {
        let guard = self.inner.read().expect("presence lock poisoned");
        for (id, conn) in guard.iter() {
            if *id != skip {
                let _ = conn.tx.send(event.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn lookup_of_unknown_participant_is_absent() {
        let registry = PresenceRegistry::new();
        assert!(registry.lookup(Uuid::new_v4()).is_none());
        assert!(!registry.push(
            Uuid::new_v4(),
            ServerEvent::Typing {
                sender_id: Uuid::new_v4()
            }
        ));
    }

    #[tokio::test]
    async fn push_reaches_registered_connection() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let (tx, mut rx) = unbounded_channel();
        registry.register(user, tx);

        let sender_id = Uuid::new_v4();
        assert!(registry.push(user, ServerEvent::Typing { sender_id }));
        assert_eq!(rx.recv().await, Some(ServerEvent::Typing { sender_id }));
    }

    #[tokio::test]
    async fn new_connection_replaces_previous_one() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let (tx1, mut rx1) = unbounded_channel();
        registry.register(user, tx1);
        let (tx2, mut rx2) = unbounded_channel();
        registry.register(user, tx2);

        let sender_id = Uuid::new_v4();
        registry.push(user, ServerEvent::Typing { sender_id });
        assert_eq!(rx2.recv().await, Some(ServerEvent::Typing { sender_id }));
        // The displaced connection's sender is gone, so its stream ends.
        assert_eq!(rx1.recv().await, None);
    }

    #[tokio::test]
    async fn stale_unregister_does_not_evict_newer_connection() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let (tx1, _rx1) = unbounded_channel();
        let stale_handle = registry.register(user, tx1);
        let (tx2, mut rx2) = unbounded_channel();
        registry.register(user, tx2);

        registry.unregister(user, stale_handle);
        assert!(registry.lookup(user).is_some());

        let sender_id = Uuid::new_v4();
        registry.push(user, ServerEvent::Typing { sender_id });
        assert_eq!(rx2.recv().await, Some(ServerEvent::Typing { sender_id }));
    }

    #[tokio::test]
    async fn register_and_unregister_broadcast_presence_to_others() {
        let registry = PresenceRegistry::new();
        let watcher = Uuid::new_v4();
        let (watcher_tx, mut watcher_rx) = unbounded_channel();
        registry.register(watcher, watcher_tx);

        let user = Uuid::new_v4();
        let (tx, _rx) = unbounded_channel();
        let handle = registry.register(user, tx);
        assert_eq!(
            watcher_rx.recv().await,
            Some(ServerEvent::ParticipantOnline {
                participant_id: user
            })
        );

        registry.unregister(user, handle);
        assert_eq!(
            watcher_rx.recv().await,
            Some(ServerEvent::ParticipantOffline {
                participant_id: user
            })
        );
    }

    #[tokio::test]
    async fn online_notice_is_not_echoed_to_self() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let (tx, mut rx) = unbounded_channel();
        registry.register(user, tx);
        assert!(rx.try_recv().is_err());
    }
}
