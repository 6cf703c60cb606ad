//! Synchronous publish/subscribe used to tell observers that observable state changed.
//! Listeners carry no payload; they re-read whatever state they care about.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

pub type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Ordered listener registry. `notify` calls listeners in subscription order on
/// the caller's thread, outside the registry lock, so a listener may subscribe
/// or unsubscribe while being notified.
#[derive(Default)]
pub struct Notifier {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").field("listeners", &self.len()).finish()
    }
}

impl Notifier {
    pub fn new() -> Self { Self::default() }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Returns false if the id was not (or no longer) subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut w = self.listeners.lock();
        let before = w.len();
        w.retain(|(sid, _)| *sid != id);
        w.len() != before
    }

    pub fn notify(&self) {
        let snapshot: Vec<Listener> = self.listeners.lock().iter().map(|(_, l)| l.clone()).collect();
        for l in snapshot {
            l();
        }
    }

    pub fn len(&self) -> usize { self.listeners.lock().len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Components whose state can be observed.
pub trait Observable {
    fn notifier(&self) -> &Notifier;

    fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifier().subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier().unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifies_in_subscription_order() {
        let n = Notifier::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = log.clone();
            n.subscribe(move || log.lock().push(i));
        }
        n.notify();
        assert_eq!(*log.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let n = Notifier::new();
        let hits = Arc::new(AtomicU64::new(0));
        let h = hits.clone();
        let id = n.subscribe(move || { h.fetch_add(1, Ordering::SeqCst); });
        n.notify();
        assert!(n.unsubscribe(id));
        assert!(!n.unsubscribe(id));
        n.notify();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(n.is_empty());
    }

    #[test]
    fn listener_may_unsubscribe_itself_during_notify() {
        let n = Arc::new(Notifier::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let (n2, slot2) = (n.clone(), slot.clone());
        let id = n.subscribe(move || {
            if let Some(id) = *slot2.lock() { n2.unsubscribe(id); }
        });
        *slot.lock() = Some(id);
        n.notify();
        assert_eq!(n.len(), 0);
    }
}
