//! Change notification: latest-value snapshots plus observer callbacks.
//!
//! Every component that owns state publishes through a [`Publisher`]. A publisher
//! keeps the current value in a `tokio::sync::watch` cell, so readers always get a
//! complete snapshot, and forwards each change to registered observers through a
//! [`DeliveryContext`]. The context decides where observers run: inline on the
//! publishing task ([`Immediate`]) or on a single consumer task ([`SerialContext`]),
//! which is how a UI thread receives updates in order.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where observer callbacks execute.
pub trait DeliveryContext: Send + Sync + 'static {
    fn post(&self, job: Job);
}

/// Runs observers on the publishing task before `publish` returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct Immediate;

impl DeliveryContext for Immediate {
    fn post(&self, job: Job) {
        job()
    }
}

/// Queues observer callbacks for one consumer that runs them strictly in order.
#[derive(Debug, Clone)]
pub struct SerialContext {
    jobs: mpsc::UnboundedSender<Job>,
}

/// Drains a [`SerialContext`] queue. Run it wherever observers should execute.
pub struct SerialRunner {
    jobs: mpsc::UnboundedReceiver<Job>,
}

impl SerialContext {
    pub fn new() -> (Self, SerialRunner) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { jobs: tx }, SerialRunner { jobs: rx })
    }
}

impl DeliveryContext for SerialContext {
    fn post(&self, job: Job) {
        if self.jobs.send(job).is_err() {
            debug!("Serial delivery runner has stopped, dropping notification");
        }
    }
}

impl SerialRunner {
    /// Run queued jobs until every context handle is dropped or `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                job = self.jobs.recv() => match job {
                    Some(job) => job(),
                    None => break,
                },
            }
        }
    }

    /// Run whatever is queued right now without waiting. Returns the number of jobs run.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.jobs.try_recv() {
            job();
            ran += 1;
        }
        ran
    }
}

/// Handle returned by [`Publisher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct Publisher<T> {
    cell: watch::Sender<T>,
    observers: Mutex<Vec<(SubscriptionId, Observer<T>)>>,
    next_id: AtomicU64,
    write: Mutex<()>,
    context: Arc<dyn DeliveryContext>,
}

impl<T: fmt::Debug> fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("current", &*self.cell.borrow())
            .field("observers", &self.observers.lock().len())
            .finish()
    }
}

impl<T> Publisher<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T, context: Arc<dyn DeliveryContext>) -> Self {
        let (cell, _) = watch::channel(initial);
        Self {
            cell,
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            write: Mutex::new(()),
            context,
        }
    }

    /// Current snapshot.
    pub fn current(&self) -> T {
        self.cell.borrow().clone()
    }

    /// Watch receiver that always holds the latest snapshot.
    pub fn watch(&self) -> watch::Receiver<T> {
        self.cell.subscribe()
    }

    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::new(observer)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// Replace the snapshot unconditionally and notify observers.
    pub fn publish(&self, value: T) {
        let _write = self.write.lock();
        self.store_and_notify(value);
    }

    /// Derive the next snapshot from the current one.
    ///
    /// `f` returns `None` to leave the snapshot untouched; nothing is published then.
    /// Updates are serialized, so two racing writers never publish out of order.
    /// `f` and observers run under the write lock and must not publish to this
    /// publisher again.
    pub fn update<F>(&self, f: F) -> Option<T>
    where
        F: FnOnce(&T) -> Option<T>,
    {
        let _write = self.write.lock();
        let next = {
            let current = self.cell.borrow();
            f(&current)
        }?;
        self.store_and_notify(next.clone());
        Some(next)
    }

    fn store_and_notify(&self, value: T) {
        self.cell.send_replace(value.clone());
        let observers: Vec<Observer<T>> =
            self.observers.lock().iter().map(|(_, observer)| observer.clone()).collect();
        if observers.is_empty() {
            return;
        }
        self.context.post(Box::new(move || {
            for observer in &observers {
                observer(&value);
            }
        }));
    }
}

impl<T> Publisher<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Publish only when `value` differs from the current snapshot.
    pub fn publish_if_changed(&self, value: T) -> bool {
        self.update(|current| (*current != value).then_some(value)).is_some()
    }
}
