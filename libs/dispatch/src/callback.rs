//! Callback Registry / Dispatcher
//!
//! Typed publish/subscribe with per-subscriber thread affinity. Each
//! registration names a callable and an optional target mailbox; `invoke`
//! runs no-target subscribers synchronously on the publishing thread and
//! marshals the rest onto their target workers as envelopes.
//!
//! The registry lock covers list mutation and the dispatch-capture snapshot
//! only. No subscriber callable ever runs with the lock held, so a
//! subscriber is free to register, unregister, or publish from inside its
//! own callback.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::envelope::Envelope;
use crate::worker::{Mailbox, WorkerId};

/// A subscriber callable. The user context of classic delegate designs is
/// simply captured state inside the closure; clones of the same `Arc` share
/// one identity for `unregister`.
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync + 'static>;

/// One subscriber entry: the callable plus its target mailbox
/// (`None` = deliver synchronously on the publishing thread).
struct Registration<T> {
    callback: Callback<T>,
    target: Option<Mailbox>,
}

impl<T> Clone for Registration<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
            target: self.target.clone(),
        }
    }
}

impl<T> Registration<T> {
    /// Identity match: same callable allocation, same target worker.
    fn matches(&self, callback: &Callback<T>, target: Option<&Mailbox>) -> bool {
        Arc::ptr_eq(&self.callback, callback)
            && match (&self.target, target) {
                (None, None) => true,
                (Some(a), Some(b)) => a.id() == b.id(),
                _ => false,
            }
    }
}

/// Thread-affine callback registry.
///
/// Registration order is delivery order within a single `invoke`; envelopes
/// from one publishing thread arrive at a given worker in `invoke` order.
pub struct AsyncCallback<T> {
    subscribers: Mutex<Vec<Registration<T>>>,
}

impl<T: Clone + Send + 'static> AsyncCallback<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Append a subscriber. Duplicate registrations are allowed and produce
    /// one delivery each (intentional fan-out); callers wanting idempotence
    /// must check before registering.
    pub fn register(&self, callback: Callback<T>, target: Option<Mailbox>) {
        debug!(
            target_worker = target.as_ref().map_or("caller-thread", |m| m.name()),
            "callback registered"
        );
        self.subscribers.lock().push(Registration { callback, target });
    }

    /// Remove the first registration matching (callable identity, target
    /// worker). Silent no-op if there is no match. An envelope already
    /// enqueued for this subscriber still executes; no new envelope will be
    /// enqueued once this returns.
    pub fn unregister(&self, callback: &Callback<T>, target: Option<&Mailbox>) {
        let mut subscribers = self.subscribers.lock();
        match subscribers.iter().position(|r| r.matches(callback, target)) {
            Some(index) => {
                subscribers.remove(index);
                debug!("callback unregistered");
            }
            None => trace!("unregister with no matching registration"),
        }
    }

    /// Drop every registration at once. Same non-retroactive guarantee as
    /// `unregister`.
    pub fn clear(&self) {
        let mut subscribers = self.subscribers.lock();
        let dropped = subscribers.len();
        subscribers.clear();
        debug!(dropped, "callback registry cleared");
    }

    /// Truthiness query: does anyone care about this event?
    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.lock().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_subscribers()
    }

    /// Publish a value to every current subscriber, in registration order.
    ///
    /// No-target subscribers run synchronously here, before the next
    /// subscriber is processed. Subscribers targeting the thread we are
    /// already on also run synchronously (marshaling to ourselves could
    /// never be observed and must not deadlock). Everything else is cloned
    /// into an envelope and posted fire-and-forget to its target mailbox.
    pub fn invoke(&self, value: &T) {
        // Dispatch-capture: snapshot under the lock, call out without it.
        // Serializes with `unregister`/`clear` so a subscriber removed
        // before this point gets nothing from this publish.
        let snapshot: Vec<Registration<T>> = self.subscribers.lock().clone();

        for registration in snapshot {
            match registration.target {
                None => (registration.callback)(value),
                Some(ref mailbox) if WorkerId::current() == Some(mailbox.id()) => {
                    (registration.callback)(value)
                }
                Some(mailbox) => {
                    let callback = registration.callback;
                    let payload = value.clone();
                    trace!(destination = %mailbox.id(), "marshaling invocation");
                    mailbox.post(Envelope::new(
                        mailbox.id(),
                        Box::new(move || callback(&payload)),
                    ));
                }
            }
        }
    }
}

impl<T: Clone + Send + 'static> Default for AsyncCallback<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for AsyncCallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCallback")
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}
