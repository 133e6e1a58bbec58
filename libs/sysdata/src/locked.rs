//! Lock-Based Mode Store
//!
//! Shared system mode guarded by a mutex. The lock covers only the stored
//! value; the transition event is published after it is released, so a slow
//! subscriber never extends the critical section. Each subscriber still sees
//! its own stream of transitions in `set_mode` call order, but subscribers
//! on different workers may observe a given transition at different times.

use callback_dispatch::AsyncCallback;
use parking_lot::Mutex;
use tracing::debug;

use crate::mode::{ModeChanged, SystemMode};

/// System mode store using mutual exclusion.
///
/// Construct one instance at process start and share it (`Arc` or borrow);
/// there is deliberately no hidden global instance.
pub struct ModeStore {
    mode: Mutex<SystemMode>,

    /// Fires `{previous, current}` on every `set_mode`
    pub mode_changed: AsyncCallback<ModeChanged>,
}

impl ModeStore {
    pub fn new() -> Self {
        Self {
            mode: Mutex::new(SystemMode::Starting),
            mode_changed: AsyncCallback::new(),
        }
    }

    /// Current mode
    pub fn mode(&self) -> SystemMode {
        *self.mode.lock()
    }

    /// Store the new mode, then publish the transition to all subscribers.
    /// Synchronous subscribers complete before this returns; thread-affine
    /// subscribers are marshaled fire-and-forget.
    pub fn set_mode(&self, mode: SystemMode) {
        let previous = {
            let mut current = self.mode.lock();
            std::mem::replace(&mut *current, mode)
        };
        debug!(?previous, current = ?mode, "system mode changed");
        self.mode_changed.invoke(&ModeChanged {
            previous,
            current: mode,
        });
    }
}

impl Default for ModeStore {
    fn default() -> Self {
        Self::new()
    }
}
