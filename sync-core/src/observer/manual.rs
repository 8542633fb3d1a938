//! In-memory observers driven by hand.
//!
//! Allows setting values, forcing `current()` failures and recording lock
//! commands for verification.

use super::{Callback, LocalStateObserver, ObserverError, SessionLock, Subscription};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Shared<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Observer whose value changes only when [`ManualObserver::set`] is called.
///
/// Clones share state, so a test can keep one handle and give another to
/// the component under test.
pub struct ManualObserver<T> {
    inner: Arc<Mutex<ObserverInner<T>>>,
}

struct ObserverInner<T> {
    value: T,
    unavailable: Option<String>,
    next_id: u64,
    subscribers: Vec<(u64, Shared<T>)>,
}

impl<T: Clone + Send + 'static> ManualObserver<T> {
    /// Create an observer holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ObserverInner {
                value,
                unavailable: None,
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Change the value and notify every subscriber, in subscription order.
    pub fn set(&self, value: T) {
        let subscribers: Vec<Shared<T>> = {
            let mut inner = lock(&self.inner);
            inner.value = value.clone();
            inner.subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        // Callbacks run without the lock held so they may call back in.
        for callback in subscribers {
            callback(value.clone());
        }
    }

    /// Last value set.
    pub fn value(&self) -> T {
        lock(&self.inner).value.clone()
    }

    /// Make `current()` fail until [`ManualObserver::restore`] is called.
    pub fn fail_current(&self, reason: &str) {
        lock(&self.inner).unavailable = Some(reason.to_string());
    }

    /// Undo [`ManualObserver::fail_current`].
    pub fn restore(&self) {
        lock(&self.inner).unavailable = None;
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }
}

impl<T> Clone for ManualObserver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> LocalStateObserver<T> for ManualObserver<T> {
    fn current(&self) -> Result<T, ObserverError> {
        let inner = lock(&self.inner);
        match &inner.unavailable {
            Some(reason) => Err(ObserverError::Unavailable(reason.clone())),
            None => Ok(inner.value.clone()),
        }
    }

    fn subscribe(&self, callback: Callback<T>) -> Subscription {
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push((id, Arc::from(callback)));
            id
        };

        let weak: Weak<Mutex<ObserverInner<T>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).subscribers.retain(|(sid, _)| *sid != id);
            }
        })
    }
}

/// Session lock backed by a [`ManualObserver<bool>`].
///
/// `lock()`/`unlock()` record the command and then behave like a real
/// session service: the lock hint changes and subscribers are notified.
#[derive(Clone)]
pub struct ManualSession {
    observer: ManualObserver<bool>,
    commands: Arc<Mutex<SessionCommands>>,
}

#[derive(Default)]
struct SessionCommands {
    issued: Vec<bool>,
    fail_next: Option<String>,
}

impl ManualSession {
    /// Create a session with the given lock hint.
    pub fn new(locked: bool) -> Self {
        Self {
            observer: ManualObserver::new(locked),
            commands: Arc::new(Mutex::new(SessionCommands::default())),
        }
    }

    /// Change the lock hint as if the user locked/unlocked locally.
    pub fn set(&self, locked: bool) {
        self.observer.set(locked);
    }

    /// Current lock hint.
    pub fn is_locked(&self) -> bool {
        self.observer.value()
    }

    /// Commands issued so far (`true` = lock, `false` = unlock).
    pub fn commands(&self) -> Vec<bool> {
        lock(&self.commands).issued.clone()
    }

    /// Cause the next lock/unlock command to fail.
    pub fn fail_next_command(&self, reason: &str) {
        lock(&self.commands).fail_next = Some(reason.to_string());
    }

    /// Make `current()` fail, as if the session service were down.
    pub fn fail_current(&self, reason: &str) {
        self.observer.fail_current(reason);
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.observer.subscriber_count()
    }

    fn command(&self, locked: bool) -> Result<(), ObserverError> {
        {
            let mut commands = lock(&self.commands);
            if let Some(reason) = commands.fail_next.take() {
                return Err(ObserverError::CommandFailed(reason));
            }
            commands.issued.push(locked);
        }
        self.observer.set(locked);
        Ok(())
    }
}

impl LocalStateObserver<bool> for ManualSession {
    fn current(&self) -> Result<bool, ObserverError> {
        self.observer.current()
    }

    fn subscribe(&self, callback: Callback<bool>) -> Subscription {
        self.observer.subscribe(callback)
    }
}

impl SessionLock for ManualSession {
    fn lock(&self) -> Result<(), ObserverError> {
        self.command(true)
    }

    fn unlock(&self) -> Result<(), ObserverError> {
        self.command(false)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, Callback<T>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, Box::new(move |v| sink.lock().unwrap().push(v)))
    }

    // ===========================================
    // ManualObserver
    // ===========================================

    #[test]
    fn current_returns_value() {
        let observer = ManualObserver::new(7);
        assert_eq!(observer.current().unwrap(), 7);
        observer.set(9);
        assert_eq!(observer.current().unwrap(), 9);
    }

    #[test]
    fn set_notifies_subscribers() {
        let observer = ManualObserver::new(0);
        let (seen, callback) = recorder();
        let _sub = observer.subscribe(callback);

        observer.set(1);
        observer.set(2);

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn cancelled_subscription_stops_notifications() {
        let observer = ManualObserver::new(0);
        let (seen, callback) = recorder();
        let sub = observer.subscribe(callback);
        assert_eq!(observer.subscriber_count(), 1);

        sub.cancel();
        observer.set(5);

        assert_eq!(observer.subscriber_count(), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn forced_unavailability() {
        let observer = ManualObserver::new(true);
        observer.fail_current("logind down");
        assert!(matches!(
            observer.current(),
            Err(ObserverError::Unavailable(_))
        ));

        observer.restore();
        assert!(observer.current().unwrap());
    }

    #[test]
    fn subscription_outliving_observer_is_harmless() {
        let observer = ManualObserver::new(0);
        let (_seen, callback) = recorder();
        let sub = observer.subscribe(callback);
        drop(observer);
        sub.cancel();
    }

    // ===========================================
    // ManualSession
    // ===========================================

    #[test]
    fn lock_command_records_and_notifies() {
        let session = ManualSession::new(false);
        let (seen, callback) = recorder();
        let _sub = session.subscribe(callback);

        session.lock().unwrap();

        assert_eq!(session.commands(), vec![true]);
        assert!(session.is_locked());
        assert_eq!(*seen.lock().unwrap(), vec![true]);
    }

    #[test]
    fn locking_twice_is_harmless() {
        let session = ManualSession::new(true);
        session.lock().unwrap();
        session.lock().unwrap();
        assert!(session.is_locked());
        assert_eq!(session.commands(), vec![true, true]);
    }

    #[test]
    fn forced_command_failure() {
        let session = ManualSession::new(false);
        session.fail_next_command("permission denied");

        assert!(matches!(
            session.lock(),
            Err(ObserverError::CommandFailed(_))
        ));
        assert!(!session.is_locked());
        assert!(session.commands().is_empty());

        // Next command works
        session.lock().unwrap();
        assert!(session.is_locked());
    }
}
