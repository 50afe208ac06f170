//! Typed event channel for the PreV engine.
//!
//! Producers (the window, input trackers, the scene) and consumers never refer
//! to each other directly. They share an [`EventChannel`], which keeps one
//! [`EventQueue`] per payload type and supports three delivery modes:
//!
//! - **Immediate**: [`EventChannel::broadcast`] calls every handler before returning.
//! - **Queued**: [`EventChannel::post_queued`] stores the event until
//!   [`EventChannel::dispatch_all`], which the main loop calls once per iteration.
//! - **Async**: [`EventChannel::post_async`] hands the event to a dedicated
//!   worker thread owned by that type's queue.
//!
//! Handlers are registered with [`EventChannel::subscribe`], which returns a
//! generation-checked [`Subscription`] token, or with
//! [`EventChannel::subscribe_guarded`], which unsubscribes on drop.

mod channel;
mod error;
pub mod events;
mod queue;

pub use channel::{DispatchQueued, EventChannel, EventQueueManager};
pub use error::{EventError, Result};
pub use queue::{Event, EventQueue, Subscription, SubscriptionGuard};
