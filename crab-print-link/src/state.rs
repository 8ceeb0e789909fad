//! Connection state and status subscriptions

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;

/// DeviceLink connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Reconnect budget spent; only an explicit `connect()` leaves this state
    GivenUp,
}

impl ConnectionState {
    /// Boolean projection handed to status subscribers
    pub fn is_usable(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::GivenUp => "given_up",
        };
        f.write_str(name)
    }
}

type StatusCallback = Box<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<(u64, StatusCallback)>,
}

/// Owns the state value and fans out usability changes.
///
/// Transitions and registrations are serialized by one lock, so a new
/// subscriber can neither miss a change nor see one twice. Callbacks run
/// under that lock and must not subscribe or unsubscribe from inside.
pub(crate) struct StatusHub {
    subscribers: Mutex<Subscribers>,
    state_tx: watch::Sender<ConnectionState>,
}

impl StatusHub {
    pub(crate) fn new() -> Arc<Self> {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Arc::new(Self {
            subscribers: Mutex::new(Subscribers::default()),
            state_tx,
        })
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Move to `next`, returning the previous state
    pub(crate) fn transition(&self, next: ConnectionState) -> ConnectionState {
        let subscribers = self.subscribers.lock();
        let previous = self.state_tx.send_replace(next);
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "Print link state changed");
        }
        if previous.is_usable() != next.is_usable() {
            for (_, callback) in &subscribers.entries {
                callback(next.is_usable());
            }
        }
        previous
    }

    pub(crate) fn subscribe(
        self: &Arc<Self>,
        callback: impl Fn(bool) + Send + Sync + 'static,
    ) -> StatusSubscription {
        let mut subscribers = self.subscribers.lock();
        callback(self.state().is_usable());

        let id = subscribers.next_id;
        subscribers.next_id += 1;
        subscribers.entries.push((id, Box::new(callback)));

        StatusSubscription {
            hub: Some(Arc::downgrade(self)),
            id,
        }
    }

    pub(crate) fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers.lock().entries.retain(|(i, _)| *i != id);
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers.lock().entries.len()
    }
}

/// Handle returned by status registration; dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct StatusSubscription {
    hub: Option<Weak<StatusHub>>,
    id: u64,
}

impl StatusSubscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the callback registered for the lifetime of the link
    pub fn detach(mut self) {
        self.hub = None;
    }

    fn release(&mut self) {
        if let Some(hub) = self.hub.take().and_then(|h| h.upgrade()) {
            hub.unsubscribe(self.id);
        }
    }
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn recorder() -> (Arc<StdMutex<Vec<bool>>>, impl Fn(bool) + Send + Sync + 'static) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |usable| sink.lock().unwrap().push(usable))
    }

    #[test]
    fn test_new_subscriber_gets_current_status() {
        let hub = StatusHub::new();
        hub.transition(ConnectionState::Connecting);
        hub.transition(ConnectionState::Connected);

        let (seen, callback) = recorder();
        let _sub = hub.subscribe(callback);
        assert_eq!(*seen.lock().unwrap(), vec![true]);
    }

    #[test]
    fn test_only_usability_changes_notify() {
        let hub = StatusHub::new();
        let (seen, callback) = recorder();
        let _sub = hub.subscribe(callback);

        hub.transition(ConnectionState::Connecting);
        hub.transition(ConnectionState::Connected);
        hub.transition(ConnectionState::Reconnecting);
        hub.transition(ConnectionState::Connecting);
        hub.transition(ConnectionState::GivenUp);

        assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let hub = StatusHub::new();
        let (seen, callback) = recorder();
        let sub = hub.subscribe(callback);
        assert_eq!(hub.subscriber_count(), 1);

        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
        hub.transition(ConnectionState::Connected);
        assert_eq!(*seen.lock().unwrap(), vec![false]);

        let (_, callback) = recorder();
        hub.subscribe(callback).detach();
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn test_watch_follows_transitions() {
        let hub = StatusHub::new();
        let rx = hub.watch();
        assert_eq!(*rx.borrow(), ConnectionState::Disconnected);
        hub.transition(ConnectionState::GivenUp);
        assert_eq!(*rx.borrow(), ConnectionState::GivenUp);
    }
}
