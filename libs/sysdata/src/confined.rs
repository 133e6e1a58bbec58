//! Thread-Confined Mode Store
//!
//! The lock-free counterpart of [`ModeStore`](crate::locked::ModeStore):
//! instead of guarding the value with a mutex, every mutation is marshaled
//! onto one dedicated worker thread through a private internal callback.
//! Only that thread computes the transition, updates the value, and
//! publishes the public event — single-writer by construction.
//!
//! `set_mode` is therefore fire-and-forget: it returns before the mutation
//! has necessarily happened. Callers needing the post-condition must wait
//! for the transition event.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use callback_dispatch::{AsyncCallback, Callback, Result, WorkerThread};
use tracing::debug;

use crate::mode::{ModeChanged, SystemMode};

/// System mode store using thread confinement instead of locking
pub struct ConfinedModeStore {
    worker: WorkerThread,
    mode_changed: Arc<AsyncCallback<ModeChanged>>,

    /// Internal marshaling callback; its sole subscriber targets `worker`
    set_mode_callback: AsyncCallback<SystemMode>,
    /// Kept so `Drop` can unregister by identity
    apply: Callback<SystemMode>,
}

impl ConfinedModeStore {
    /// Create the store and start its dedicated worker thread.
    pub fn new() -> Result<Self> {
        let worker = WorkerThread::new("sysdata-confined");
        let mode_changed = Arc::new(AsyncCallback::new());

        // The stored value. Read and written exclusively on the dedicated
        // worker; the atomic exists to satisfy `Sync`, the confinement is
        // the real synchronization.
        let mode = Arc::new(AtomicU8::new(SystemMode::Starting.into()));

        let apply: Callback<SystemMode> = {
            let events = Arc::clone(&mode_changed);
            Arc::new(move |requested: &SystemMode| {
                let previous = SystemMode::try_from(
                    mode.swap((*requested).into(), Ordering::Relaxed),
                )
                .expect("stored mode is always a valid discriminant");
                debug!(?previous, current = ?requested, "system mode changed (confined)");
                events.invoke(&ModeChanged {
                    previous,
                    current: *requested,
                });
            })
        };

        // Register before start, as the worker drains its backlog anyway.
        let set_mode_callback = AsyncCallback::new();
        set_mode_callback.register(Arc::clone(&apply), Some(worker.mailbox()));
        worker.start()?;

        Ok(Self {
            worker,
            mode_changed,
            set_mode_callback,
            apply,
        })
    }

    /// Request a mode change. The mutation and the public `mode_changed`
    /// publish both happen later, on the dedicated worker thread.
    pub fn set_mode(&self, mode: SystemMode) {
        self.set_mode_callback.invoke(&mode);
    }

    /// Fires `{previous, current}` for every applied mode change, always
    /// from the dedicated worker thread.
    pub fn mode_changed(&self) -> &AsyncCallback<ModeChanged> {
        &self.mode_changed
    }

    // No `mode()` accessor: reading the value off the dedicated thread
    // would break the confinement invariant.
}

impl Drop for ConfinedModeStore {
    fn drop(&mut self) {
        self.set_mode_callback
            .unregister(&self.apply, Some(&self.worker.mailbox()));
        self.worker.exit();
        let _ = self.worker.join();
    }
}
