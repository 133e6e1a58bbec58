//! Thread-Affine Callback Dispatch
//!
//! Publish/subscribe callback infrastructure where every subscriber declares
//! which thread its callable runs on. Publishers never wait on asynchronous
//! subscribers: a cross-thread delivery is cloned into an envelope, posted
//! to the target worker's FIFO mailbox, and executed by that worker's
//! message loop.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  AsyncCallback<T>    │   no target      ┌─────────────────────┐
//! │                      │─────────────────▶│ subscriber callable │
//! │  ┌────────────────┐  │   (synchronous)  │ (publisher thread)  │
//! │  │ Registration   │  │                  └─────────────────────┘
//! │  │ Registration   │  │
//! │  │ Registration   │  │   target = worker W
//! │  └────────────────┘  │──────────┐
//! └──────────────────────┘          ▼
//!                          ┌──────────────────┐    ┌─────────────────────┐
//!                          │ Envelope         │    │ WorkerThread W      │
//!                          │ (payload clone + │───▶│ mailbox ▷ msg loop  │
//!                          │  bound callable) │    │ (FIFO, drains, runs)│
//!                          └──────────────────┘    └─────────────────────┘
//! ```
//!
//! # Guarantees
//!
//! - Registration order is delivery order within one `invoke` call.
//! - Envelopes from one publishing thread reach a given worker in `invoke`
//!   order (FIFO per destination).
//! - `unregister`/`clear` serialize with dispatch-capture: once they return,
//!   that subscriber gains no *new* deliveries, though an envelope already
//!   in a mailbox still executes.
//! - A worker drains every envelope queued before `exit()` and then stops.
//!
//! # Caller obligations
//!
//! Asynchronous invocations hold their own payload copy and callable `Arc`,
//! so they survive the publisher. State captured *by reference* inside a
//! subscriber closure must stay alive until the subscriber is unregistered
//! and in-flight envelopes have drained; prefer capturing `Arc`s.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use callback_dispatch::{AsyncCallback, Callback, WorkerThread};
//!
//! let worker = WorkerThread::new("logger");
//! worker.start().unwrap();
//!
//! let on_change: AsyncCallback<i32> = AsyncCallback::new();
//! let callback: Callback<i32> = Arc::new(|value| {
//!     println!("changed to {value}");
//! });
//! on_change.register(Arc::clone(&callback), Some(worker.mailbox()));
//!
//! on_change.invoke(&42); // fire-and-forget, runs on `worker`
//!
//! on_change.unregister(&callback, Some(&worker.mailbox()));
//! worker.exit();
//! worker.join().unwrap();
//! ```

pub mod callback;
pub mod envelope;
pub mod error;
pub mod worker;

pub use callback::{AsyncCallback, Callback};
pub use envelope::Envelope;
pub use error::{DispatchError, Result};
pub use worker::{Mailbox, WorkerId, WorkerState, WorkerThread};
