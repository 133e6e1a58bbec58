//! Shared System-Mode Stores
//!
//! Two implementations of the same contract — "hold the system mode, notify
//! subscribers of every transition" — contrasting the concurrency
//! disciplines the dispatch layer enables:
//!
//! - [`ModeStore`]: classic lock-based mutation; the mutex guards the value,
//!   the publish happens outside the critical section.
//! - [`ConfinedModeStore`]: no lock at all; mutation is marshaled onto one
//!   dedicated worker thread, which is the only thread ever touching the
//!   value.
//!
//! Both publish [`ModeChanged`] through a [`callback_dispatch::AsyncCallback`],
//! so subscribers choose per-registration whether they run synchronously on
//! the publishing thread or on a worker of their own.

pub mod confined;
pub mod locked;
pub mod mode;

pub use confined::ConfinedModeStore;
pub use locked::ModeStore;
pub use mode::{ModeChanged, SystemMode};
