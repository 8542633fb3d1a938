//! Ordered listener lists for component events.

/// Handle returned by [`Listeners::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callbacks invoked synchronously, in registration order.
pub struct Listeners<E> {
    next_id: u64,
    entries: Vec<(ListenerId, Box<dyn FnMut(&E) + Send>)>,
}

impl<E> Listeners<E> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Append a listener.
    pub fn register(&mut self, listener: impl FnMut(&E) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(lid, _)| *lid != id);
        self.entries.len() != before
    }

    /// Invoke every listener with `event`.
    pub fn emit(&mut self, event: &E) {
        for (_, listener) in self.entries.iter_mut() {
            listener(event);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn emits_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = Listeners::new();

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            listeners.register(move |value: &u32| order.lock().unwrap().push((tag, *value)));
        }

        listeners.emit(&7);

        assert_eq!(
            *order.lock().unwrap(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn removed_listener_is_not_called() {
        let calls = Arc::new(Mutex::new(0));
        let mut listeners = Listeners::new();
        let counter = Arc::clone(&calls);
        let id = listeners.register(move |_: &()| *counter.lock().unwrap() += 1);

        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        listeners.emit(&());

        assert_eq!(*calls.lock().unwrap(), 0);
        assert!(listeners.is_empty());
    }
}
