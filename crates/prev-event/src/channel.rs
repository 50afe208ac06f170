//! Type-indexed event channel.

use std::any::{Any, TypeId};
use std::sync::{Arc, Weak};

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};

use crate::error::Result;
use crate::queue::{Event, EventQueue, Subscription, SubscriptionGuard};

/// Type-erased view of a queue used for flushing queued events.
pub trait DispatchQueued: Send + Sync {
    /// Deliver the queued backlog, returning how many events were delivered.
    fn dispatch_queued(&self) -> usize;
}

impl<E: Event> DispatchQueued for EventQueue<E> {
    fn dispatch_queued(&self) -> usize {
        self.dispatch()
    }
}

/// Tracks every live queue so their backlogs can be flushed in one call.
///
/// Holds weak references only; queues that have been dropped are pruned on
/// the next [`EventQueueManager::dispatch_all`].
#[derive(Default)]
pub struct EventQueueManager {
    queues: Mutex<Vec<Weak<dyn DispatchQueued>>>,
}

impl EventQueueManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a queue.
    pub fn register<E: Event>(&self, queue: &Arc<EventQueue<E>>) {
        let weak: Weak<dyn DispatchQueued> = Arc::downgrade(queue) as Weak<dyn DispatchQueued>;
        self.queues.lock().push(weak);
    }

    /// Number of live queues.
    pub fn len(&self) -> usize {
        self.queues
            .lock()
            .iter()
            .filter(|q| q.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush the queued backlog of every tracked queue, in registration order.
    pub fn dispatch_all(&self) -> usize {
        let live: Vec<Arc<dyn DispatchQueued>> = {
            let mut queues = self.queues.lock();
            queues.retain(|q| q.strong_count() > 0);
            queues.iter().filter_map(Weak::upgrade).collect()
        };

        live.iter().map(|q| q.dispatch_queued()).sum()
    }
}

struct ChannelInner {
    queues: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    manager: EventQueueManager,
}

/// Publish/subscribe bus keyed by event type.
///
/// Cloning is cheap and every clone refers to the same set of queues, so one
/// channel is created at startup and handed to each subsystem that produces or
/// consumes events.
///
/// ```
/// use prev_event::EventChannel;
///
/// #[derive(Clone)]
/// struct Ping(u32);
///
/// let channel = EventChannel::new();
/// let sub = channel.subscribe(|p: &Ping| println!("ping {}", p.0));
/// channel.broadcast(&Ping(1));
/// channel.post_queued(Ping(2));
/// channel.dispatch_all();
/// channel.unsubscribe(sub).unwrap();
/// ```
#[derive(Clone)]
pub struct EventChannel {
    inner: Arc<ChannelInner>,
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("queues", &self.inner.queues.read().len())
            .finish()
    }
}

impl EventChannel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                queues: RwLock::new(HashMap::new()),
                manager: EventQueueManager::new(),
            }),
        }
    }

    /// The queue for `E`, created on first use.
    pub fn queue<E: Event>(&self) -> Arc<EventQueue<E>> {
        let key = TypeId::of::<E>();

        if let Some(queue) = self.inner.queues.read().get(&key) {
            return downcast(queue);
        }

        let mut queues = self.inner.queues.write();
        let queue = queues.entry(key).or_insert_with(|| {
            let queue = Arc::new(EventQueue::<E>::new());
            self.inner.manager.register(&queue);
            let erased: Arc<dyn Any + Send + Sync> = queue;
            erased
        });
        downcast(queue)
    }

    /// Register a handler for `E`.
    pub fn subscribe<E, F>(&self, handler: F) -> Subscription<E>
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.queue::<E>().subscribe(handler)
    }

    /// Register a handler that is removed when the returned guard drops.
    pub fn subscribe_guarded<E, F>(&self, handler: F) -> SubscriptionGuard<E>
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let queue = self.queue::<E>();
        let subscription = queue.subscribe(handler);
        SubscriptionGuard::new(&queue, subscription)
    }

    /// Remove a handler. Fails if it is not registered.
    pub fn unsubscribe<E: Event>(&self, subscription: Subscription<E>) -> Result<()> {
        self.queue::<E>().unsubscribe(subscription)
    }

    /// Deliver `event` to all current handlers before returning.
    pub fn broadcast<E: Event>(&self, event: &E) {
        self.queue::<E>().post(event);
    }

    /// Store `event` until the next [`EventChannel::dispatch_all`].
    pub fn post_queued<E: Event>(&self, event: E) {
        self.queue::<E>().post_queued(event);
    }

    /// Deliver `event` on the worker thread owned by the queue for `E`.
    pub fn post_async<E: Event>(&self, event: E) -> Result<()> {
        self.queue::<E>().post_async(event)
    }

    /// Flush the queued backlog of every event type.
    pub fn dispatch_all(&self) -> usize {
        self.inner.manager.dispatch_all()
    }

    /// Number of handlers registered for `E`.
    pub fn handler_count<E: Event>(&self) -> usize {
        self.inner
            .queues
            .read()
            .get(&TypeId::of::<E>())
            .map_or(0, |q| downcast::<E>(q).handler_count())
    }
}

fn downcast<E: Event>(queue: &Arc<dyn Any + Send + Sync>) -> Arc<EventQueue<E>> {
    queue
        .clone()
        .downcast::<EventQueue<E>>()
        .unwrap_or_else(|_| unreachable!("queue stored under a foreign TypeId"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, PartialEq)]
    struct A(u32);

    #[derive(Clone, Debug, PartialEq)]
    struct B(&'static str);

    #[test]
    fn same_type_shares_queue() {
        let channel = EventChannel::new();
        let a = channel.queue::<A>();
        let b = channel.clone().queue::<A>();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn channels_are_isolated() {
        let first = EventChannel::new();
        let second = EventChannel::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        first.subscribe(move |_: &A| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        second.broadcast(&A(1));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        first.broadcast(&A(1));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_all_flushes_every_type() {
        let channel = EventChannel::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = log.clone();
        channel.subscribe(move |a: &A| l.lock().push(format!("a{}", a.0)));
        let l = log.clone();
        channel.subscribe(move |b: &B| l.lock().push(format!("b{}", b.0)));

        channel.post_queued(A(1));
        channel.post_queued(B("x"));
        channel.post_queued(A(2));
        assert!(log.lock().is_empty());

        assert_eq!(channel.dispatch_all(), 3);
        assert_eq!(*log.lock(), vec!["a1", "a2", "bx"]);
        assert_eq!(channel.dispatch_all(), 0);
    }

    #[test]
    fn manager_prunes_dropped_queues() {
        let manager = EventQueueManager::new();
        let queue = Arc::new(EventQueue::<A>::new());
        manager.register(&queue);
        assert_eq!(manager.len(), 1);

        drop(queue);
        assert_eq!(manager.dispatch_all(), 0);
        assert!(manager.is_empty());
    }

    #[test]
    fn handler_count_without_queue_is_zero() {
        let channel = EventChannel::new();
        assert_eq!(channel.handler_count::<A>(), 0);
        let _guard = channel.subscribe_guarded(|_: &A| {});
        assert_eq!(channel.handler_count::<A>(), 1);
    }
}
