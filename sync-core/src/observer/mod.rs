//! Local State Observer capability.
//!
//! The OS-level resource behind a component (battery meter, session lock
//! hint) is reached only through this module's traits:
//! - `current()` reads the present value
//! - `subscribe()` registers a change callback and returns a [`Subscription`]
//!
//! Dropping or cancelling the subscription unregisters the callback, which is
//! how a Device Link stops local notifications when it disconnects.
//!
//! # Example
//!
//! ```ignore
//! let session = ManualSession::new(false);
//! let sub = session.subscribe(Box::new(|locked| println!("locked: {locked}")));
//! session.set(true);   // prints "locked: true"
//! sub.cancel();
//! ```

mod manual;

pub use manual::{ManualObserver, ManualSession};

use thiserror::Error;

/// Observer errors.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// The underlying service cannot be reached.
    #[error("observer unavailable: {0}")]
    Unavailable(String),

    /// A command (lock/unlock) was rejected by the service.
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Change notification callback.
pub type Callback<T> = Box<dyn Fn(T) + Send + Sync>;

/// Read + watch access to one OS-level value.
pub trait LocalStateObserver<T>: Send + Sync {
    /// Current value.
    fn current(&self) -> Result<T, ObserverError>;

    /// Register a change callback.
    ///
    /// The callback stays registered until the returned [`Subscription`]
    /// is cancelled or dropped.
    fn subscribe(&self, callback: Callback<T>) -> Subscription;
}

/// Session lock hint with lock/unlock commands.
///
/// Locking an already locked session must be a harmless no-op.
pub trait SessionLock: LocalStateObserver<bool> {
    /// Lock the local session.
    fn lock(&self) -> Result<(), ObserverError>;

    /// Unlock the local session.
    fn unlock(&self) -> Result<(), ObserverError>;
}

/// Cancel token returned by [`LocalStateObserver::subscribe`].
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Create a subscription that runs `cancel` exactly once.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to cancel (observer cannot notify).
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Unregister the callback now.
    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn cancel_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sub.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_cancels() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        {
            let _sub = Subscription::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detached_is_inert() {
        let sub = Subscription::detached();
        assert_eq!(format!("{:?}", sub), "Subscription { active: false }");
        sub.cancel();
    }
}
