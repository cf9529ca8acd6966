// src/tasks/executor.rs
//! Single-worker task executors.
//!
//! Each [`TaskExecutor`] owns one named worker thread that runs submitted
//! units in FIFO order. Screens own one executor each, so cancelling a
//! screen's pending work never touches another screen's queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, OnceLock, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use log::{debug, error, warn};
use parking_lot::{Condvar, Mutex};

use super::cancel::CancelToken;
use super::registry::{ExecutorRegistry, RegistryInner};
use super::result::{BoxError, ChainLink, Outcome, TaskCell, TaskError, TaskResult, cancel_chain};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// State shared between an executor handle, its worker and its task cells.
pub(crate) struct ExecutorShared {
    id: u64,
    name: Arc<str>,
    pending: Mutex<HashMap<u64, Arc<dyn ChainLink>>>,
    worker: OnceLock<ThreadId>,
    terminated: Mutex<bool>,
    terminated_cv: Condvar,
    next_task: AtomicU64,
}

impl ExecutorShared {
    fn new(id: u64, name: Arc<str>) -> Self {
        Self {
            id,
            name,
            pending: Mutex::new(HashMap::new()),
            worker: OnceLock::new(),
            terminated: Mutex::new(false),
            terminated_cv: Condvar::new(),
            next_task: AtomicU64::new(1),
        }
    }

    pub(crate) fn is_worker_thread(&self) -> bool {
        self.worker
            .get()
            .is_some_and(|id| *id == thread::current().id())
    }

    pub(crate) fn forget(&self, task: u64) {
        self.pending.lock().remove(&task);
    }

    fn track(&self, task: u64, link: Arc<dyn ChainLink>) {
        self.pending.lock().insert(task, link);
    }

    fn mark_terminated(&self) {
        *self.terminated.lock() = true;
        self.terminated_cv.notify_all();
    }

    fn wait_terminated(&self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        let mut terminated = self.terminated.lock();
        while !*terminated {
            if self
                .terminated_cv
                .wait_until(&mut terminated, deadline)
                .timed_out()
            {
                return *terminated;
            }
        }
        true
    }
}

pub(crate) struct ExecutorInner {
    shared: Arc<ExecutorShared>,
    jobs: Mutex<Option<Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    registry: Weak<RegistryInner>,
}

impl Drop for ExecutorInner {
    fn drop(&mut self) {
        // The worker drains what is queued and exits once the sender is gone.
        self.jobs.get_mut().take();
    }
}

/// Handle to a single-threaded FIFO executor.
///
/// Clones share the same worker and pending set.
#[derive(Clone)]
pub struct TaskExecutor {
    inner: Arc<ExecutorInner>,
}

fn worker_loop(shared: Arc<ExecutorShared>, jobs: Receiver<Job>) {
    debug!("Executor `{}` worker started", shared.name);
    for job in jobs {
        job();
    }
    shared.mark_terminated();
    debug!("Executor `{}` worker stopped", shared.name);
}

impl TaskExecutor {
    /// Create an executor tracked by the process-wide registry.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_registry(ExecutorRegistry::global(), name)
    }

    /// Create an executor tracked by `registry`.
    ///
    /// If the registry was already shut down, the executor is created shut
    /// down as well and rejects every submission.
    pub fn with_registry(registry: &ExecutorRegistry, name: impl Into<String>) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        let shared = Arc::new(ExecutorShared::new(registry.next_executor_id(), name.clone()));
        let (tx, rx) = mpsc::channel::<Job>();
        let executor = Self {
            inner: Arc::new(ExecutorInner {
                shared: shared.clone(),
                jobs: Mutex::new(Some(tx)),
                worker: Mutex::new(None),
                registry: registry.downgrade(),
            }),
        };

        if !registry.register(shared.id, &executor.inner) {
            error!("Executor registry is shut down; `{name}` will reject all work");
            executor.inner.jobs.lock().take();
            shared.mark_terminated();
            return executor;
        }

        let spawned = thread::Builder::new()
            .name(format!("{name}-worker"))
            .spawn(move || worker_loop(shared, rx));
        match spawned {
            Ok(handle) => {
                let _ = executor.inner.shared.worker.set(handle.thread().id());
                *executor.inner.worker.lock() = Some(handle);
            }
            Err(err) => {
                error!("Failed to spawn worker for executor `{name}`: {err}");
                executor.inner.jobs.lock().take();
                executor.inner.shared.mark_terminated();
                registry.unregister(executor.inner.shared.id);
            }
        }
        executor
    }

    pub(crate) fn from_inner(inner: Arc<ExecutorInner>) -> Self {
        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.shared.name
    }

    pub fn id(&self) -> u64 {
        self.inner.shared.id
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.jobs.lock().is_none()
    }

    /// Whether the calling thread is this executor's worker.
    pub fn is_worker_thread(&self) -> bool {
        self.inner.shared.is_worker_thread()
    }

    /// Units queued or running that have not finished yet.
    pub fn pending_count(&self) -> usize {
        self.inner.shared.pending.lock().len()
    }

    pub(crate) fn enqueue<T, W>(&self, previous: Option<Arc<dyn ChainLink>>, work: W) -> TaskResult<T>
    where
        T: Clone + Send + 'static,
        W: FnOnce(&CancelToken) -> Outcome<T> + Send + 'static,
    {
        let shared = &self.inner.shared;
        let id = shared.next_task.fetch_add(1, Ordering::Relaxed);
        let cell = Arc::new(TaskCell::new(id, Arc::downgrade(shared)));
        if let Some(previous) = previous {
            cell.link_previous(previous);
        }
        let result = TaskResult::new(cell.clone(), self.clone());

        let jobs = self.inner.jobs.lock();
        let Some(sender) = jobs.as_ref() else {
            error!("Task submitted to shut down executor `{}`", shared.name);
            cell.finish(Err(TaskError::Rejected(shared.name.clone())));
            return result;
        };

        shared.track(cell.id(), cell.clone());
        let job_cell = cell.clone();
        if sender.send(Box::new(move || job_cell.run(work))).is_err() {
            error!("Worker of executor `{}` is gone; task rejected", shared.name);
            shared.forget(cell.id());
            cell.finish(Err(TaskError::Rejected(shared.name.clone())));
        }
        result
    }

    /// Queue `work` behind everything already submitted.
    pub fn submit<T, F>(&self, work: F) -> TaskResult<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce(&CancelToken) -> Result<T, BoxError> + Send + 'static,
    {
        self.enqueue(None, move |token| Outcome::from_work(work(token)))
    }

    /// Queue `work`, which first sleeps for `delay`.
    ///
    /// Cancelling during the sleep ends the unit without running `work`.
    pub fn submit_after_delay<T, F>(&self, delay: Duration, work: F) -> TaskResult<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce(&CancelToken) -> Result<T, BoxError> + Send + 'static,
    {
        self.enqueue(None, move |token| match token.sleep(delay) {
            Ok(()) => Outcome::from_work(work(token)),
            Err(_) => Outcome::Cancelled,
        })
    }

    /// A unit that only waits; chain work onto it with [`TaskResult::then`].
    pub fn submit_wait(&self, delay: Duration) -> TaskResult<()> {
        self.submit_after_delay(delay, |_| Ok(()))
    }

    /// An already-successful result, useful as the head of a chain.
    pub fn completed<T: Clone + Send + 'static>(&self, value: T) -> TaskResult<T> {
        self.finished_result(Ok(value))
    }

    /// An already-failed result.
    pub fn failed<T: Clone + Send + 'static>(&self, err: impl Into<BoxError>) -> TaskResult<T> {
        self.finished_result(Err(TaskError::Failed(Arc::from(err.into()))))
    }

    fn finished_result<T: Clone + Send + 'static>(&self, result: Result<T, TaskError>) -> TaskResult<T> {
        let shared = &self.inner.shared;
        let id = shared.next_task.fetch_add(1, Ordering::Relaxed);
        let cell = Arc::new(TaskCell::new(id, Arc::downgrade(shared)));
        cell.finish(result);
        TaskResult::new(cell, self.clone())
    }

    /// Cancel every unit still queued or running here, along with their chains.
    ///
    /// Returns the number of units that were outstanding.
    pub fn cancel_all_pending(&self) -> usize {
        let outstanding: Vec<Arc<dyn ChainLink>> = self.inner.shared.pending.lock().values().cloned().collect();
        let count = outstanding.len();
        for link in outstanding {
            cancel_chain(link);
        }
        if count > 0 {
            debug!("Cancelled {count} pending task(s) on `{}`", self.name());
        }
        count
    }

    /// Stop accepting work, cancel what is outstanding and stop the worker.
    ///
    /// Waits up to the registry's grace period for the worker to exit, except
    /// when called from the worker itself. Safe to call more than once.
    pub fn shutdown(&self) {
        let sender = self.inner.jobs.lock().take();
        let first = sender.is_some();
        drop(sender);

        let grace = match self.inner.registry.upgrade() {
            Some(registry) => {
                registry.unregister(self.id());
                registry.grace()
            }
            None => ExecutorRegistry::DEFAULT_GRACE,
        };
        self.cancel_all_pending();
        if first {
            debug!("Executor `{}` shutting down", self.name());
        }

        if self.is_worker_thread() {
            return;
        }
        if self.inner.shared.wait_terminated(grace) {
            if let Some(handle) = self.inner.worker.lock().take()
                && handle.join().is_err()
            {
                warn!("Worker of executor `{}` panicked", self.name());
            }
        } else {
            warn!("Executor `{}` did not stop within {:?}", self.name(), grace);
        }
    }
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::Interrupted;
    use std::sync::atomic::AtomicUsize;

    fn executor(name: &str) -> (ExecutorRegistry, TaskExecutor) {
        let registry = ExecutorRegistry::new();
        let executor = TaskExecutor::with_registry(&registry, name);
        (registry, executor)
    }

    #[derive(Debug)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn test_units_run_in_submission_order() {
        let (registry, executor) = executor("fifo");
        let log = Arc::new(Mutex::new(Vec::new()));
        let results: Vec<_> = (0..10)
            .map(|i| {
                let log = log.clone();
                executor.submit(move |_| {
                    log.lock().push(i);
                    Ok(i)
                })
            })
            .collect();
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.get().unwrap(), i);
        }
        assert_eq!(*log.lock(), (0..10).collect::<Vec<_>>());
        assert_eq!(executor.pending_count(), 0);
        registry.shutdown_all();
    }

    #[test]
    fn test_cancel_during_delay_skips_work() {
        let (registry, executor) = executor("delay");
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let result = executor.submit_after_delay(Duration::from_secs(10), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        thread::sleep(Duration::from_millis(30));
        assert!(result.cancel());
        assert!(result.is_cancelled());
        assert!(matches!(result.get(), Err(TaskError::Cancelled)));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        registry.shutdown_all();
    }

    #[test]
    fn test_cancel_queued_unit() {
        let (registry, executor) = executor("queued");
        let blocker = executor.submit(|token| {
            token.sleep(Duration::from_secs(10))?;
            Ok(())
        });
        let queued = executor.submit(|_| Ok(1));
        assert!(queued.cancel());
        assert!(queued.is_cancelled());
        assert!(blocker.cancel());
        assert!(blocker.is_cancelled());
        registry.shutdown_all();
    }

    #[test]
    fn test_cancel_completed_returns_false() {
        let (registry, executor) = executor("done");
        let result = executor.submit(|_| Ok(5));
        assert_eq!(result.get().unwrap(), 5);
        assert!(!result.cancel());
        assert!(!result.is_cancelled());
        registry.shutdown_all();
    }

    #[test]
    fn test_chain_passes_values() {
        let (registry, executor) = executor("chain");
        let result = executor
            .submit(|_| Ok(2))
            .then(|v, _| Ok(v * 10))
            .then(|v, _| Ok(format!("{v}")));
        assert_eq!(result.get().unwrap(), "20");
        registry.shutdown_all();
    }

    #[test]
    fn test_cancel_chain_stops_every_unit() {
        let (registry, executor) = executor("cancel-chain");
        let stopped = Arc::new(AtomicUsize::new(0));
        let first_stopped = stopped.clone();
        let a = executor.submit(move |token| {
            let slept = token.sleep(Duration::from_secs(10));
            first_stopped.fetch_add(1, Ordering::SeqCst);
            slept?;
            Ok(1)
        });
        let b = a.then(|v, _| Ok(v + 1));
        let c = b.then(|v, _| Ok(v + 1));
        thread::sleep(Duration::from_millis(30));

        assert!(c.cancel());
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert!(c.is_cancelled());
        registry.shutdown_all();
    }

    #[test]
    fn test_failure_reaches_handler_once() {
        let (registry, executor) = executor("failure");
        let calls = Arc::new(AtomicUsize::new(0));
        let head = executor.submit(|token| {
            token.sleep(Duration::from_millis(50))?;
            Err::<u32, BoxError>(Box::new(Boom))
        });
        let counter = calls.clone();
        head.on_exception(move |err| {
            assert!(matches!(err, TaskError::Failed(_)));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let tail = head.then(|v, _| Ok(v + 1)).then(|v, _| Ok(v + 1));

        assert!(matches!(tail.get(), Err(TaskError::Failed(_))));
        assert!(matches!(head.get(), Err(TaskError::Failed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        registry.shutdown_all();
    }

    #[test]
    fn test_second_handler_is_ignored() {
        let (registry, executor) = executor("handlers");
        let gate = executor.submit(|token| {
            token.sleep(Duration::from_millis(50))?;
            Ok(())
        });
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let failing = gate.then(|_, _| -> Result<(), BoxError> { Err(Box::new(Boom)) });
        let counter = first.clone();
        failing.on_exception(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = second.clone();
        gate.on_exception(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(failing.get().is_err());
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        registry.shutdown_all();
    }

    #[test]
    fn test_panicking_handler_is_contained() {
        let (registry, executor) = executor("panicky");
        let gate = executor.submit(|token| {
            token.sleep(Duration::from_millis(30))?;
            Err::<(), BoxError>(Box::new(Boom))
        });
        gate.on_exception(|_| panic!("handler exploded"));
        assert!(gate.get().is_err());
        assert_eq!(executor.submit(|_| Ok(3)).get().unwrap(), 3);
        registry.shutdown_all();
    }

    #[test]
    fn test_panicking_body_becomes_failure() {
        let (registry, executor) = executor("panic-body");
        let result = executor.submit(|_| -> Result<(), BoxError> { panic!("body exploded") });
        match result.get() {
            Err(TaskError::Failed(err)) => assert!(err.to_string().contains("body exploded")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(executor.submit(|_| Ok(4)).get().unwrap(), 4);
        registry.shutdown_all();
    }

    #[test]
    fn test_cancel_handler_fires_once() {
        let (registry, executor) = executor("cancel-handler");
        let calls = Arc::new(AtomicUsize::new(0));
        let a = executor.submit(|token| {
            token.sleep(Duration::from_secs(10))?;
            Ok(())
        });
        let counter = calls.clone();
        a.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let b = a.then(|_, _| Ok(()));
        thread::sleep(Duration::from_millis(30));
        b.cancel();
        let _ = executor.submit(|_| Ok(())).get();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        registry.shutdown_all();
    }

    #[test]
    fn test_interrupted_error_counts_as_cancel() {
        let (registry, executor) = executor("interrupted");
        let result = executor.submit(|_| -> Result<(), BoxError> { Err(Box::new(Interrupted)) });
        assert!(matches!(result.get(), Err(TaskError::Cancelled)));
        registry.shutdown_all();
    }

    #[test]
    fn test_self_cancel_does_not_block() {
        let (registry, executor) = executor("self-cancel");
        let handle = executor.clone();
        let result = executor.submit(move |token| {
            handle.cancel_all_pending();
            Ok(token.is_cancelled())
        });
        assert!(matches!(result.get(), Err(TaskError::Cancelled)));
        registry.shutdown_all();
    }

    #[test]
    fn test_completed_and_failed_results() {
        let (registry, executor) = executor("ready");
        assert_eq!(executor.completed(7).then(|v, _| Ok(v * 2)).get().unwrap(), 14);
        let failed: TaskResult<u8> = executor.failed(Boom);
        assert!(failed.is_done());
        assert!(matches!(failed.then(|v, _| Ok(v)).get(), Err(TaskError::Failed(_))));
        registry.shutdown_all();
    }

    #[test]
    fn test_shutdown_rejects_new_work() {
        let (_registry, executor) = executor("closed");
        executor.shutdown();
        assert!(executor.is_shut_down());
        let result = executor.submit(|_| Ok(1));
        assert!(matches!(result.get(), Err(TaskError::Rejected(_))));
        executor.shutdown();
    }

    #[test]
    fn test_cancel_all_pending_clears_queue() {
        let (registry, executor) = executor("clear");
        let results: Vec<_> = (0..3)
            .map(|_| {
                executor.submit(|token| {
                    token.sleep(Duration::from_secs(10))?;
                    Ok(())
                })
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(executor.cancel_all_pending(), 3);
        assert_eq!(executor.pending_count(), 0);
        assert!(results.iter().all(|r| r.is_cancelled()));
        registry.shutdown_all();
    }
}
