//! Listener lists owned by the input components.

use std::sync::Arc;

use parking_lot::Mutex;

/// Token returned when a listener is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Ordered list of callbacks for one payload type.
///
/// Notification runs on a snapshot, so a listener may add or remove
/// listeners (including itself) while being called.
pub struct Listeners<E> {
    inner: Mutex<ListenerList<E>>,
}

struct ListenerList<E> {
    next_id: u64,
    entries: Vec<(ListenerId, Callback<E>)>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(ListenerList {
                next_id: 0,
                entries: Vec::new(),
            }),
        }
    }
}

impl<E> Listeners<E> {
    pub fn add<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.entries.push((id, Arc::new(listener)));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|(entry, _)| *entry != id);
        inner.entries.len() != before
    }

    #[must_use]
    pub fn contains(&self, id: ListenerId) -> bool {
        self.inner.lock().entries.iter().any(|(entry, _)| *entry == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self
            .inner
            .lock()
            .entries
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in snapshot {
            callback(event);
        }
    }
}
