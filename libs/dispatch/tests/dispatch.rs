//! End-to-end dispatch behavior: ordering, thread affinity, and
//! unregistration guarantees across real worker threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::thread;

use callback_dispatch::{AsyncCallback, Callback, WorkerThread};
use crossbeam_channel::unbounded;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env(),
            )
            .with_test_writer()
            .try_init();
    });
}

#[test]
fn async_subscriber_sees_publishes_in_fifo_order() {
    init_tracing();
    let worker = WorkerThread::new("w-fifo");
    worker.start().unwrap();

    let (tx, rx) = unbounded();
    let event: AsyncCallback<i32> = AsyncCallback::new();
    let callback: Callback<i32> = Arc::new(move |value: &i32| {
        tx.send(*value).unwrap();
    });
    event.register(callback, Some(worker.mailbox()));

    for i in 0..1000 {
        event.invoke(&i);
    }

    // Exit drains the mailbox before the loop returns, so after join every
    // envelope has executed.
    worker.exit();
    worker.join().unwrap();

    let received: Vec<i32> = rx.try_iter().collect();
    assert_eq!(received, (0..1000).collect::<Vec<_>>());
}

#[test]
fn async_subscriber_runs_on_its_target_worker() {
    init_tracing();
    let worker = WorkerThread::new("w-affinity");
    worker.start().unwrap();

    let (tx, rx) = unbounded();
    let event: AsyncCallback<u8> = AsyncCallback::new();
    event.register(
        Arc::new(move |_: &u8| {
            tx.send(thread::current().name().map(str::to_owned)).unwrap();
        }),
        Some(worker.mailbox()),
    );

    event.invoke(&0);
    worker.exit();
    worker.join().unwrap();

    assert_eq!(rx.try_recv().unwrap().as_deref(), Some("w-affinity"));
}

#[test]
fn sync_subscriber_runs_on_the_publisher_thread() {
    init_tracing();
    let event: AsyncCallback<u8> = AsyncCallback::new();
    let (tx, rx) = unbounded();
    event.register(
        Arc::new(move |_: &u8| {
            tx.send(thread::current().id()).unwrap();
        }),
        None,
    );

    event.invoke(&0);
    assert_eq!(rx.try_recv().unwrap(), thread::current().id());
}

#[test]
fn mixed_subscribers_dispatch_in_registration_order() {
    init_tracing();
    let worker = WorkerThread::new("w-mixed");
    worker.start().unwrap();

    let (tx, rx) = unbounded();
    let event: AsyncCallback<i32> = AsyncCallback::new();

    let sync_first = {
        let tx = tx.clone();
        Arc::new(move |v: &i32| tx.send(("sync-a", *v)).unwrap()) as Callback<i32>
    };
    let async_middle = {
        let tx = tx.clone();
        Arc::new(move |v: &i32| tx.send(("async", *v)).unwrap()) as Callback<i32>
    };
    let sync_last = Arc::new(move |v: &i32| tx.send(("sync-b", *v)).unwrap()) as Callback<i32>;

    event.register(sync_first, None);
    event.register(async_middle, Some(worker.mailbox()));
    event.register(sync_last, None);

    event.invoke(&1);

    // Both synchronous subscribers completed before `invoke` returned, in
    // registration order.
    assert_eq!(rx.try_recv().unwrap(), ("sync-a", 1));
    assert_eq!(rx.try_recv().unwrap(), ("sync-b", 1));

    worker.exit();
    worker.join().unwrap();
    assert_eq!(rx.try_recv().unwrap(), ("async", 1));
}

#[test]
fn unregistered_subscriber_receives_nothing_from_later_invokes() {
    init_tracing();
    let worker = WorkerThread::new("w-unreg");
    worker.start().unwrap();

    let (tx, rx) = unbounded();
    let event: AsyncCallback<i32> = AsyncCallback::new();
    let callback: Callback<i32> = Arc::new(move |v: &i32| tx.send(*v).unwrap());
    event.register(Arc::clone(&callback), Some(worker.mailbox()));

    event.invoke(&1);
    event.unregister(&callback, Some(&worker.mailbox()));
    event.invoke(&2);

    worker.exit();
    worker.join().unwrap();
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn clear_silences_every_subscriber() {
    init_tracing();
    let worker = WorkerThread::new("w-clear");
    worker.start().unwrap();

    let (tx, rx) = unbounded();
    let event: AsyncCallback<i32> = AsyncCallback::new();
    let sync_tx = tx.clone();
    event.register(Arc::new(move |v: &i32| sync_tx.send(*v).unwrap()), None);
    event.register(
        Arc::new(move |v: &i32| tx.send(*v).unwrap()),
        Some(worker.mailbox()),
    );

    event.clear();
    assert!(!event.has_subscribers());
    event.invoke(&3);

    worker.exit();
    worker.join().unwrap();
    assert!(rx.try_iter().next().is_none());
}

#[test]
fn publishing_to_the_current_worker_delivers_synchronously() {
    init_tracing();
    let worker = WorkerThread::new("w-self");
    worker.start().unwrap();

    let delivered = Arc::new(AtomicBool::new(false));
    let inner: Arc<AsyncCallback<i32>> = Arc::new(AsyncCallback::new());
    {
        let delivered = Arc::clone(&delivered);
        inner.register(
            Arc::new(move |_: &i32| delivered.store(true, Ordering::SeqCst)),
            Some(worker.mailbox()),
        );
    }

    let (tx, rx) = unbounded();
    let outer: AsyncCallback<i32> = AsyncCallback::new();
    {
        let inner = Arc::clone(&inner);
        let delivered = Arc::clone(&delivered);
        outer.register(
            Arc::new(move |v: &i32| {
                // Already on `w-self`; the nested publish targets the same
                // worker and must complete before `invoke` returns.
                inner.invoke(v);
                tx.send(delivered.load(Ordering::SeqCst)).unwrap();
            }),
            Some(worker.mailbox()),
        );
    }

    outer.invoke(&0);
    worker.exit();
    worker.join().unwrap();
    assert!(rx.try_recv().unwrap());
}

#[test]
fn envelopes_enqueued_before_start_drain_once_started() {
    init_tracing();
    let worker = WorkerThread::new("w-prestart");
    let (tx, rx) = unbounded();
    let event: AsyncCallback<i32> = AsyncCallback::new();
    event.register(
        Arc::new(move |v: &i32| tx.send(*v).unwrap()),
        Some(worker.mailbox()),
    );

    // Queue work while the worker is still in `Created`.
    event.invoke(&1);
    event.invoke(&2);

    worker.start().unwrap();
    worker.exit();
    worker.join().unwrap();
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn two_workers_receive_independent_streams() {
    init_tracing();
    let first = WorkerThread::new("w-one");
    let second = WorkerThread::new("w-two");
    first.start().unwrap();
    second.start().unwrap();

    let (tx1, rx1) = unbounded();
    let (tx2, rx2) = unbounded();
    let event: AsyncCallback<i32> = AsyncCallback::new();
    event.register(
        Arc::new(move |v: &i32| tx1.send(*v).unwrap()),
        Some(first.mailbox()),
    );
    event.register(
        Arc::new(move |v: &i32| tx2.send(*v).unwrap()),
        Some(second.mailbox()),
    );

    for i in 0..10 {
        event.invoke(&i);
    }

    first.exit();
    second.exit();
    first.join().unwrap();
    second.join().unwrap();

    let expected: Vec<i32> = (0..10).collect();
    assert_eq!(rx1.try_iter().collect::<Vec<_>>(), expected);
    assert_eq!(rx2.try_iter().collect::<Vec<_>>(), expected);
}
