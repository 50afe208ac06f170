//! Per-type subscription registry with immediate, queued and async delivery.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;

use crate::error::{EventError, Result};

/// Marker for types that can travel through an event queue.
pub trait Event: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Event for T {}

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Token identifying one registered handler.
///
/// Tokens carry the generation of the slot they were issued for, so a token
/// that outlives its handler can never remove a newer handler occupying the
/// same slot.
pub struct Subscription<E> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn(&E)>,
}

impl<E> Clone for Subscription<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Subscription<E> {}

impl<E> PartialEq for Subscription<E> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<E> Eq for Subscription<E> {}

impl<E> fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &type_name::<E>())
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}

struct Slot<E> {
    generation: u32,
    handler: Option<Handler<E>>,
}

struct Registry<E> {
    slots: Vec<Slot<E>>,
    free: Vec<u32>,
    /// Live slot indices in registration order.
    order: Vec<u32>,
    pending: Vec<E>,
}

impl<E> Default for Registry<E> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            pending: Vec::new(),
        }
    }
}

impl<E> Registry<E> {
    fn insert(&mut self, handler: Handler<E>) -> Subscription<E> {
        let index = if let Some(index) = self.free.pop() {
            self.slots[index as usize].handler = Some(handler);
            index
        } else {
            let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot {
                generation: 0,
                handler: Some(handler),
            });
            index
        };
        self.order.push(index);

        Subscription {
            index,
            generation: self.slots[index as usize].generation,
            _marker: PhantomData,
        }
    }

    fn remove(&mut self, subscription: Subscription<E>) -> bool {
        let Some(slot) = self.slots.get_mut(subscription.index as usize) else {
            return false;
        };
        if slot.generation != subscription.generation || slot.handler.is_none() {
            return false;
        }

        slot.handler = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(subscription.index);
        self.order.retain(|&i| i != subscription.index);
        true
    }

    fn snapshot(&self) -> Vec<Handler<E>> {
        self.order
            .iter()
            .filter_map(|&i| self.slots[i as usize].handler.clone())
            .collect()
    }
}

/// Background thread delivering events posted with [`EventQueue::post_async`].
struct AsyncWorker<E> {
    tx: Sender<E>,
    thread: Option<JoinHandle<()>>,
}

impl<E: Event> AsyncWorker<E> {
    fn spawn(queue: Weak<EventQueue<E>>) -> Result<Self> {
        let (tx, rx) = channel::unbounded::<E>();

        let name = format!("event-async:{}", short_type_name::<E>());
        tracing::debug!("Starting async event worker {name}");
        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || {
                while let Ok(event) = rx.recv() {
                    let Some(queue) = queue.upgrade() else {
                        break;
                    };
                    queue.post(&event);
                }
            })?;

        Ok(Self {
            tx,
            thread: Some(thread),
        })
    }

    fn shutdown(self) {
        let Self { tx, thread } = self;
        // Disconnect first so the worker leaves its recv loop.
        drop(tx);

        if let Some(thread) = thread {
            // The last strong reference can be released by the worker itself.
            if thread.thread().id() != thread::current().id() && thread.join().is_err() {
                tracing::error!(
                    "Async event worker for {} panicked",
                    short_type_name::<E>()
                );
            }
        }
    }
}

fn short_type_name<E>() -> &'static str {
    let full = type_name::<E>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Subscription registry for a single event type.
///
/// Handlers are invoked from a snapshot taken under the lock, and the lock is
/// released before any handler runs. A handler may therefore subscribe or
/// unsubscribe freely; such changes take effect from the next delivery.
pub struct EventQueue<E: Event> {
    registry: Mutex<Registry<E>>,
    worker: Mutex<Option<AsyncWorker<E>>>,
}

impl<E: Event> Default for EventQueue<E> {
    fn default() -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            worker: Mutex::new(None),
        }
    }
}

impl<E: Event> EventQueue<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler.
    pub fn subscribe<F>(&self, handler: F) -> Subscription<E>
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.registry.lock().insert(Arc::new(handler))
    }

    /// Remove a handler.
    ///
    /// Fails if the subscription is not currently registered on this queue.
    pub fn unsubscribe(&self, subscription: Subscription<E>) -> Result<()> {
        if self.registry.lock().remove(subscription) {
            Ok(())
        } else {
            Err(EventError::UnknownSubscription(type_name::<E>()))
        }
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.registry.lock().order.len()
    }

    /// Number of events waiting for [`EventQueue::dispatch`].
    pub fn pending_count(&self) -> usize {
        self.registry.lock().pending.len()
    }

    /// Deliver an event to every handler before returning.
    pub fn post(&self, event: &E) {
        let handlers = self.registry.lock().snapshot();
        for handler in &handlers {
            handler(event);
        }
    }

    /// Store an event for the next [`EventQueue::dispatch`].
    pub fn post_queued(&self, event: E) {
        self.registry.lock().pending.push(event);
    }

    /// Hand an event to this queue's worker thread.
    ///
    /// The worker is started on first use. Delivery order is preserved among
    /// async events of this type only.
    pub fn post_async(self: &Arc<Self>, event: E) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_none() {
            *worker = Some(AsyncWorker::spawn(Arc::downgrade(self))?);
        }
        if let Some(worker) = worker.as_ref() {
            // The receiver lives as long as the worker, which we hold.
            let _ = worker.tx.send(event);
        }
        Ok(())
    }

    /// Deliver all queued events in posting order.
    ///
    /// Events queued by handlers during this call wait for the next dispatch.
    pub fn dispatch(&self) -> usize {
        let (handlers, pending) = {
            let mut registry = self.registry.lock();
            if registry.pending.is_empty() {
                return 0;
            }
            (registry.snapshot(), std::mem::take(&mut registry.pending))
        };

        for event in &pending {
            for handler in &handlers {
                handler(event);
            }
        }
        pending.len()
    }
}

impl<E: Event> Drop for EventQueue<E> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.shutdown();
        }
    }
}

/// Removes its subscription when dropped.
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct SubscriptionGuard<E: Event> {
    queue: Weak<EventQueue<E>>,
    subscription: Subscription<E>,
}

impl<E: Event> SubscriptionGuard<E> {
    pub(crate) fn new(queue: &Arc<EventQueue<E>>, subscription: Subscription<E>) -> Self {
        Self {
            queue: Arc::downgrade(queue),
            subscription,
        }
    }

    /// The guarded subscription token.
    pub const fn subscription(&self) -> Subscription<E> {
        self.subscription
    }
}

impl<E: Event> Drop for SubscriptionGuard<E> {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.upgrade() {
            // Already removed by hand is fine.
            let _ = queue.unsubscribe(self.subscription);
        }
    }
}
