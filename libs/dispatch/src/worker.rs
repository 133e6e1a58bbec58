//! Worker Thread
//!
//! A dedicated OS thread owning one FIFO mailbox of envelopes. The thread
//! blocks while the mailbox is empty, dequeues envelopes strictly in enqueue
//! order, executes each one, and drops it. The thread's identity is the unit
//! of thread affinity that subscriber registrations name as their target.
//!
//! Lifecycle: `Created → Running → ExitRequested → Stopped`. The exit
//! sentinel is an ordinary mailbox message, so all work enqueued before
//! `exit()` still runs before the loop returns.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::envelope::{Envelope, ThreadMessage};
use crate::error::{DispatchError, Result};

thread_local! {
    /// Identity of the worker currently running on this thread, if any
    static CURRENT_WORKER: Cell<Option<WorkerId>> = const { Cell::new(None) };
}

/// Unique worker thread identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId {
    id: Uuid,
}

impl WorkerId {
    fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    /// Identity of the worker thread we are currently executing on, or
    /// `None` when called from a thread that is not a worker (e.g. a
    /// publisher thread). The dispatcher uses this for the same-thread
    /// delivery optimization.
    pub fn current() -> Option<WorkerId> {
        CURRENT_WORKER.with(|c| c.get())
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.id.simple())
    }
}

/// Worker lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Created = 0,
    Running = 1,
    ExitRequested = 2,
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WorkerState::Created,
            1 => WorkerState::Running,
            2 => WorkerState::ExitRequested,
            3 => WorkerState::Stopped,
            _ => unreachable!("invalid worker state discriminant"),
        }
    }
}

/// State shared between the `WorkerThread` owner, its `Mailbox` handles,
/// and the message loop itself.
struct MailboxShared {
    id: WorkerId,
    name: String,
    tx: Sender<ThreadMessage>,
    state: AtomicU8,
}

impl MailboxShared {
    fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Enqueue one message. Posting to a stopped worker is a programming
    /// error: the dispatcher is the sole producer and must not outlive the
    /// workers its registrations target.
    fn post(&self, msg: ThreadMessage) {
        if self.state() == WorkerState::Stopped || self.tx.send(msg).is_err() {
            panic!("posted to stopped worker thread '{}'", self.name);
        }
    }
}

/// Cloneable producer handle to a worker's mailbox.
///
/// Subscriber registrations hold one of these as their target; the
/// dispatcher posts envelopes through it.
#[derive(Clone)]
pub struct Mailbox {
    shared: Arc<MailboxShared>,
}

impl Mailbox {
    /// Identity of the worker this mailbox feeds
    pub fn id(&self) -> WorkerId {
        self.shared.id
    }

    /// Worker thread name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub(crate) fn post(&self, envelope: Envelope) {
        self.shared.post(ThreadMessage::Execute(envelope));
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .finish()
    }
}

/// A dedicated OS thread executing marshaled invocations in FIFO order
pub struct WorkerThread {
    shared: Arc<MailboxShared>,
    /// Consumer side of the mailbox; moved into the message loop by `start`
    receiver: Mutex<Option<Receiver<ThreadMessage>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerThread {
    /// Create a worker in the `Created` state. The mailbox exists from this
    /// point on, so registrations and enqueues may precede `start()`; queued
    /// envelopes are drained once the message loop runs.
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            shared: Arc::new(MailboxShared {
                id: WorkerId::new(),
                name: name.into(),
                tx,
                state: AtomicU8::new(WorkerState::Created as u8),
            }),
            receiver: Mutex::new(Some(rx)),
            handle: Mutex::new(None),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }

    /// Producer handle used as a registration target
    pub fn mailbox(&self) -> Mailbox {
        Mailbox {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Spawn the OS thread and enter the message loop.
    pub fn start(&self) -> Result<()> {
        self.shared
            .state
            .compare_exchange(
                WorkerState::Created as u8,
                WorkerState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| DispatchError::AlreadyStarted(self.shared.name.clone()))?;

        // The CAS above guarantees a single winner, so the receiver is
        // still present here.
        let Some(rx) = self.receiver.lock().take() else {
            return Err(DispatchError::AlreadyStarted(self.shared.name.clone()));
        };

        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name(self.shared.name.clone())
            .spawn(move || message_loop(shared, rx))
            .map_err(|source| {
                // The receiver went down with the dropped closure; this
                // worker can never run, so mark it stopped.
                self.shared
                    .state
                    .store(WorkerState::Stopped as u8, Ordering::Release);
                DispatchError::Spawn {
                    name: self.shared.name.clone(),
                    source,
                }
            })?;

        *self.handle.lock() = Some(handle);
        Ok(())
    }

    /// Request an orderly stop: the exit sentinel is enqueued behind any
    /// pending envelopes, so all previously queued work still runs. No-op
    /// (with a warning) on a worker that has already stopped.
    pub fn exit(&self) {
        if self.shared.state() == WorkerState::Stopped {
            warn!(worker = %self.shared.id, name = %self.shared.name,
                  "exit requested on stopped worker");
            return;
        }

        if self.shared.tx.send(ThreadMessage::Exit).is_err() {
            warn!(worker = %self.shared.id, name = %self.shared.name,
                  "exit requested on stopped worker");
            return;
        }

        // Created and Running both advance to ExitRequested; a worker that
        // never started will drain and stop as soon as it does start.
        let _ = self.shared.state.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |raw| match WorkerState::from_u8(raw) {
                WorkerState::Created | WorkerState::Running => {
                    Some(WorkerState::ExitRequested as u8)
                }
                _ => None,
            },
        );
        debug!(worker = %self.shared.id, name = %self.shared.name, "exit requested");
    }

    /// Wait for the message loop to return.
    pub fn join(&self) -> Result<()> {
        let handle = self
            .handle
            .lock()
            .take()
            .ok_or_else(|| DispatchError::NotStarted(self.shared.name.clone()))?;
        handle
            .join()
            .map_err(|_| DispatchError::Join(self.shared.name.clone()))
    }
}

impl fmt::Debug for WorkerThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerThread")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("state", &self.shared.state())
            .finish()
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        // Safety net for callers that forget an orderly shutdown; the
        // detached thread still drains its queue before returning.
        match self.shared.state() {
            WorkerState::Created | WorkerState::Running => {
                let _ = self.shared.tx.send(ThreadMessage::Exit);
            }
            _ => {}
        }
    }
}

fn message_loop(shared: Arc<MailboxShared>, rx: Receiver<ThreadMessage>) {
    CURRENT_WORKER.with(|c| c.set(Some(shared.id)));
    debug!(worker = %shared.id, name = %shared.name, "worker thread started");

    // `recv` can only fail once every sender is gone; `shared` holds one,
    // so the loop always ends via the exit sentinel.
    while let Ok(msg) = rx.recv() {
        match msg {
            ThreadMessage::Execute(envelope) => envelope.execute(),
            ThreadMessage::Exit => break,
        }
    }

    shared
        .state
        .store(WorkerState::Stopped as u8, Ordering::Release);
    debug!(worker = %shared.id, name = %shared.name, "worker thread stopped");
}
