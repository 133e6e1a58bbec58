//! System Mode Types
//!
//! The example payload published by both stores: a small operating-mode enum
//! and the previous/current transition record delivered to subscribers.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Coarse operating mode of the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum SystemMode {
    /// Initial mode at store construction
    Starting = 0,
    Normal = 1,
    Service = 2,
    /// System inoperable
    Inoperable = 3,
}

/// Transition record published on every mode change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChanged {
    pub previous: SystemMode,
    pub current: SystemMode,
}
