// src/tasks/registry.rs
//! Process-wide bookkeeping of live executors for orderly shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use log::info;
use parking_lot::Mutex;

use super::executor::{ExecutorInner, TaskExecutor};

#[derive(Default)]
struct RegistryState {
    closed: bool,
    executors: Vec<(u64, Weak<ExecutorInner>)>,
}

pub(crate) struct RegistryInner {
    state: Mutex<RegistryState>,
    /// Serializes concurrent `shutdown_all` calls.
    shutting_down: Mutex<()>,
    grace: Duration,
    next_id: AtomicU64,
}

impl RegistryInner {
    pub(crate) fn unregister(&self, id: u64) {
        self.state.lock().executors.retain(|(existing, _)| *existing != id);
    }

    pub(crate) fn grace(&self) -> Duration {
        self.grace
    }
}

/// Tracks every executor created against it so they can be stopped together.
///
/// Executors are held weakly: dropping every handle to an executor removes it
/// from the registry's view.
#[derive(Clone)]
pub struct ExecutorRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutorRegistry {
    /// How long shutdown waits for each worker to exit.
    pub const DEFAULT_GRACE: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self::with_shutdown_grace(Self::DEFAULT_GRACE)
    }

    pub fn with_shutdown_grace(grace: Duration) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                state: Mutex::new(RegistryState::default()),
                shutting_down: Mutex::new(()),
                grace,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// The registry [`TaskExecutor::new`] uses.
    pub fn global() -> &'static ExecutorRegistry {
        static GLOBAL: OnceLock<ExecutorRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ExecutorRegistry::new)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Number of registered executors that still have live handles.
    pub fn live_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .executors
            .iter()
            .filter(|(_, executor)| executor.strong_count() > 0)
            .count()
    }

    /// Close the registry and shut down every executor it tracks.
    ///
    /// Executors created afterwards start shut down. Executors registered
    /// while this runs are picked up by the next sweep.
    pub fn shutdown_all(&self) {
        let _serial = self.inner.shutting_down.lock();
        self.inner.state.lock().closed = true;
        info!("Shutting down all task executors");

        loop {
            let live: Vec<TaskExecutor> = {
                let mut state = self.inner.state.lock();
                state.executors.retain(|(_, executor)| executor.strong_count() > 0);
                state
                    .executors
                    .iter()
                    .filter_map(|(_, executor)| executor.upgrade())
                    .map(TaskExecutor::from_inner)
                    .collect()
            };
            if live.is_empty() {
                break;
            }
            for executor in live {
                executor.shutdown();
            }
        }
    }

    pub(crate) fn next_executor_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// False if the registry is already closed.
    pub(crate) fn register(&self, id: u64, executor: &Arc<ExecutorInner>) -> bool {
        let mut state = self.inner.state.lock();
        if state.closed {
            return false;
        }
        state.executors.push((id, Arc::downgrade(executor)));
        true
    }

    pub(crate) fn unregister(&self, id: u64) {
        self.inner.unregister(id);
    }

    pub(crate) fn downgrade(&self) -> Weak<RegistryInner> {
        Arc::downgrade(&self.inner)
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("closed", &self.is_shut_down())
            .field("live", &self.live_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskError;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_shutdown_all_stops_every_executor() {
        let registry = ExecutorRegistry::new();
        let a = TaskExecutor::with_registry(&registry, "a");
        let b = TaskExecutor::with_registry(&registry, "b");
        let sleeping = b.submit(|token| {
            token.sleep(Duration::from_secs(10))?;
            Ok(())
        });
        assert_eq!(registry.live_count(), 2);

        registry.shutdown_all();

        assert!(registry.is_shut_down());
        assert!(a.is_shut_down());
        assert!(b.is_shut_down());
        assert!(sleeping.is_cancelled());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_executor_after_shutdown_rejects() {
        let registry = ExecutorRegistry::new();
        registry.shutdown_all();
        let late = TaskExecutor::with_registry(&registry, "late");
        assert!(late.is_shut_down());
        assert!(matches!(late.submit(|_| Ok(())).get(), Err(TaskError::Rejected(_))));
    }

    #[test]
    fn test_dropped_executors_are_not_live() {
        let registry = ExecutorRegistry::new();
        {
            let _short = TaskExecutor::with_registry(&registry, "short");
            assert_eq!(registry.live_count(), 1);
        }
        assert_eq!(registry.live_count(), 0);
        registry.shutdown_all();
    }

    #[test]
    fn test_shutdown_from_worker_thread() {
        let registry = ExecutorRegistry::new();
        let executor = TaskExecutor::with_registry(&registry, "inside");
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let handle = registry.clone();
        let result = executor.submit(move |_| {
            handle.shutdown_all();
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        assert!(matches!(result.get(), Err(TaskError::Cancelled)));
        assert!(finished.load(Ordering::SeqCst));
        assert!(executor.is_shut_down());
    }
}
