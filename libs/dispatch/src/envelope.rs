//! Message Envelope
//!
//! The owned, type-erased unit of work that carries one marshaled callback
//! invocation across a thread boundary. An envelope is built by the
//! dispatcher at publish time, travels through the destination worker's
//! mailbox, is executed exactly once by the worker loop, and is dropped
//! immediately afterwards.
//!
//! The envelope owns a clone of the payload and an `Arc` to the subscriber's
//! callable, so it stays valid even if the publishing registry is dropped
//! while the envelope is still in flight.

use std::fmt;

use crate::worker::WorkerId;

/// Type-erased invocation: the subscriber callable bound to its payload copy
pub(crate) type Invocation = Box<dyn FnOnce() + Send + 'static>;

/// One marshaled callback invocation in flight to a worker thread
pub struct Envelope {
    /// Worker the invocation must execute on
    destination: WorkerId,

    /// The bound callable; consumed by `execute`
    invocation: Invocation,
}

impl Envelope {
    pub(crate) fn new(destination: WorkerId, invocation: Invocation) -> Self {
        Self {
            destination,
            invocation,
        }
    }

    /// Worker this envelope is addressed to
    pub fn destination(&self) -> WorkerId {
        self.destination
    }

    /// Run the bound invocation, consuming the envelope.
    ///
    /// Only the destination worker's message loop may call this.
    pub(crate) fn execute(self) {
        debug_assert_eq!(
            WorkerId::current(),
            Some(self.destination),
            "envelope executed off its destination worker"
        );
        (self.invocation)();
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

/// Mailbox message: either work to run or the exit sentinel.
///
/// The exit sentinel is a dedicated variant, so a malformed message kind is
/// unrepresentable; the worker loop never needs a fallback arm.
pub(crate) enum ThreadMessage {
    /// Execute a marshaled invocation, then drop it
    Execute(Envelope),

    /// Drain no further; the message loop returns once this is consumed
    Exit,
}
