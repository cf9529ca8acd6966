// src/tasks/result.rs
//! Handles to submitted task units.
//!
//! A [`TaskResult`] is the eventual outcome of one unit. Results chain with
//! [`TaskResult::then`]; each link remembers its predecessor, so cancelling any
//! result walks back through the chain and stops every unit on it. Exception
//! and cancel handlers live on the chain's root and fire at most once.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, Weak};

use log::{error, warn};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use super::cancel::{CANCEL_POLL, CancelToken, Interrupted};
use super::executor::{ExecutorShared, TaskExecutor};

/// Error type task bodies return.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A failure shared by every clone of a finished result.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("task was cancelled")]
    Cancelled,
    #[error("task failed: {0}")]
    Failed(SharedError),
    #[error("executor `{0}` is shut down and rejected the task")]
    Rejected(Arc<str>),
}

impl TaskError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }
}

/// A task body panicked instead of returning.
#[derive(Debug, Error)]
#[error("task panicked: {0}")]
pub struct TaskPanic(String);

impl TaskPanic {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self(message)
    }
}

#[derive(Debug, Clone)]
pub enum TaskState<T> {
    Pending,
    Running,
    Finished(Result<T, TaskError>),
}

/// What a unit's body produced, before it is published as a result.
pub(crate) enum Outcome<T> {
    Done(T),
    Failed(SharedError),
    /// A predecessor's failure passed along the chain; handlers already saw it.
    Propagated(TaskError),
    Cancelled,
}

impl<T> Outcome<T> {
    pub(crate) fn from_work(result: Result<T, BoxError>) -> Self {
        match result {
            Ok(value) => Outcome::Done(value),
            Err(err) if err.is::<Interrupted>() => Outcome::Cancelled,
            Err(err) => Outcome::Failed(Arc::from(err)),
        }
    }
}

type ExceptionHandler = Box<dyn FnOnce(&TaskError) + Send>;
type CancelHandler = Box<dyn FnOnce() + Send>;

/// Set-once handler slots. Each handler is taken when it fires.
#[derive(Default)]
pub(crate) struct ChainHandlers {
    on_exception: OnceLock<Mutex<Option<ExceptionHandler>>>,
    on_cancel: OnceLock<Mutex<Option<CancelHandler>>>,
}

impl ChainHandlers {
    fn set_exception(&self, handler: ExceptionHandler) -> bool {
        self.on_exception.set(Mutex::new(Some(handler))).is_ok()
    }

    fn set_cancel(&self, handler: CancelHandler) -> bool {
        self.on_cancel.set(Mutex::new(Some(handler))).is_ok()
    }

    /// Returns false when no handler was waiting.
    fn fire_exception(&self, err: &TaskError) -> bool {
        let Some(handler) = self.on_exception.get().and_then(|slot| slot.lock().take()) else {
            return false;
        };
        if panic::catch_unwind(AssertUnwindSafe(|| handler(err))).is_err() {
            error!("Task exception handler panicked");
        }
        true
    }

    fn fire_cancel(&self) {
        let Some(handler) = self.on_cancel.get().and_then(|slot| slot.lock().take()) else {
            return;
        };
        if panic::catch_unwind(AssertUnwindSafe(handler)).is_err() {
            error!("Task cancel handler panicked");
        }
    }
}

/// Type-erased view of a unit, used to walk and cancel chains.
pub(crate) trait ChainLink: Send + Sync {
    fn previous(&self) -> Option<Arc<dyn ChainLink>>;
    fn handlers(&self) -> &ChainHandlers;
    /// Cancel this unit only. Returns whether the cancel had an effect.
    fn cancel_unit(&self) -> bool;
}

pub(crate) fn chain_root(link: Arc<dyn ChainLink>) -> Arc<dyn ChainLink> {
    let mut current = link;
    while let Some(previous) = current.previous() {
        current = previous;
    }
    current
}

/// Cancel `link` and every predecessor. True if any unit was affected.
pub(crate) fn cancel_chain(link: Arc<dyn ChainLink>) -> bool {
    let mut affected = false;
    let mut next = Some(link);
    while let Some(current) = next {
        affected |= current.cancel_unit();
        next = current.previous();
    }
    affected
}

pub(crate) struct TaskCell<T> {
    id: u64,
    state: Mutex<TaskState<T>>,
    finished: Condvar,
    token: CancelToken,
    previous: OnceLock<Arc<dyn ChainLink>>,
    handlers: ChainHandlers,
    owner: Weak<ExecutorShared>,
}

impl<T: Clone + Send + 'static> TaskCell<T> {
    pub(crate) fn new(id: u64, owner: Weak<ExecutorShared>) -> Self {
        Self {
            id,
            state: Mutex::new(TaskState::Pending),
            finished: Condvar::new(),
            token: CancelToken::new(),
            previous: OnceLock::new(),
            handlers: ChainHandlers::default(),
            owner,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn link_previous(&self, previous: Arc<dyn ChainLink>) {
        if self.previous.set(previous).is_err() {
            panic!("task unit {} already follows a predecessor", self.id);
        }
    }

    pub(crate) fn finish(&self, result: Result<T, TaskError>) {
        *self.state.lock() = TaskState::Finished(result);
        self.finished.notify_all();
    }

    fn forget(&self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.forget(self.id);
        }
    }

    fn root(self: &Arc<Self>) -> Arc<dyn ChainLink> {
        chain_root(self.clone())
    }

    /// Pending -> Running. False if the unit was cancelled while queued.
    fn begin(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            TaskState::Pending => {
                *state = TaskState::Running;
                true
            }
            _ => false,
        }
    }

    /// Execute the unit on the calling (worker) thread and publish the result.
    pub(crate) fn run<W>(self: &Arc<Self>, work: W)
    where
        W: FnOnce(&CancelToken) -> Outcome<T>,
    {
        if !self.begin() {
            self.root().handlers().fire_cancel();
            self.forget();
            return;
        }

        let outcome = {
            let _scope = self.token.enter();
            panic::catch_unwind(AssertUnwindSafe(|| work(&self.token)))
                .unwrap_or_else(|payload| Outcome::Failed(Arc::new(TaskPanic::from_payload(payload))))
        };
        let outcome = if self.token.is_cancelled() {
            Outcome::Cancelled
        } else {
            outcome
        };

        let result = match outcome {
            Outcome::Done(value) => Ok(value),
            Outcome::Failed(err) => {
                let err = TaskError::Failed(err);
                if !self.root().handlers().fire_exception(&err) {
                    warn!("Task {} failed with no exception handler: {}", self.id, err);
                }
                Err(err)
            }
            Outcome::Propagated(err) => Err(err),
            Outcome::Cancelled => {
                self.root().handlers().fire_cancel();
                Err(TaskError::Cancelled)
            }
        };
        self.finish(result);
        self.forget();
    }

    fn is_finished(&self) -> bool {
        matches!(*self.state.lock(), TaskState::Finished(_))
    }

    fn snapshot(&self) -> TaskState<T> {
        self.state.lock().clone()
    }

    /// Block until finished. On a task thread the wait gives up when that
    /// task is cancelled.
    fn wait(&self) -> Result<Result<T, TaskError>, Interrupted> {
        let token = CancelToken::current();
        let mut state = self.state.lock();
        loop {
            if let TaskState::Finished(result) = &*state {
                return Ok(result.clone());
            }
            match &token {
                Some(token) => {
                    token.check()?;
                    self.finished.wait_for(&mut state, CANCEL_POLL);
                }
                None => self.finished.wait(&mut state),
            }
        }
    }

    /// Like [`wait`](Self::wait) but driven by an explicit token.
    pub(crate) fn wait_with(&self, token: &CancelToken) -> Result<Result<T, TaskError>, Interrupted> {
        let mut state = self.state.lock();
        loop {
            if let TaskState::Finished(result) = &*state {
                return Ok(result.clone());
            }
            token.check()?;
            self.finished.wait_for(&mut state, CANCEL_POLL);
        }
    }
}

impl<T: Clone + Send + 'static> ChainLink for TaskCell<T> {
    fn previous(&self) -> Option<Arc<dyn ChainLink>> {
        self.previous.get().cloned()
    }

    fn handlers(&self) -> &ChainHandlers {
        &self.handlers
    }

    fn cancel_unit(&self) -> bool {
        let affected = {
            let mut state = self.state.lock();
            match *state {
                TaskState::Pending => {
                    *state = TaskState::Finished(Err(TaskError::Cancelled));
                    self.finished.notify_all();
                    true
                }
                TaskState::Running => {
                    self.token.cancel();
                    let on_own_worker = self
                        .owner
                        .upgrade()
                        .is_some_and(|owner| owner.is_worker_thread());
                    if !on_own_worker {
                        while matches!(*state, TaskState::Running) {
                            self.finished.wait(&mut state);
                        }
                    }
                    !matches!(*state, TaskState::Finished(Ok(_)))
                }
                TaskState::Finished(Ok(_)) => false,
                TaskState::Finished(Err(_)) => true,
            }
        };
        self.forget();
        affected
    }
}

/// Eventual outcome of a submitted unit.
///
/// Cloning a result clones the handle, not the unit.
pub struct TaskResult<T> {
    cell: Arc<TaskCell<T>>,
    executor: TaskExecutor,
}

impl<T> Clone for TaskResult<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            executor: self.executor.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> TaskResult<T> {
    pub(crate) fn new(cell: Arc<TaskCell<T>>, executor: TaskExecutor) -> Self {
        Self { cell, executor }
    }

    /// Block until the unit finishes and return its outcome.
    ///
    /// Called from inside another task, the wait ends with
    /// [`TaskError::Cancelled`] once that task is cancelled.
    pub fn get(&self) -> Result<T, TaskError> {
        match self.cell.wait() {
            Ok(result) => result,
            Err(Interrupted) => Err(TaskError::Cancelled),
        }
    }

    pub fn state(&self) -> TaskState<T> {
        self.cell.snapshot()
    }

    pub fn is_done(&self) -> bool {
        self.cell.is_finished()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            *self.cell.state.lock(),
            TaskState::Finished(Err(TaskError::Cancelled))
        )
    }

    pub fn executor(&self) -> &TaskExecutor {
        &self.executor
    }

    /// Cancel this unit and every predecessor it was chained from.
    ///
    /// Returns once no unit of the chain is still running, unless the caller
    /// is the chain's own worker thread. The result is true if any unit was
    /// pending, running or had already failed.
    pub fn cancel(&self) -> bool {
        cancel_chain(self.cell.clone())
    }

    /// Handler invoked once if any unit of this chain fails.
    ///
    /// Only the first handler set on a chain is kept.
    pub fn on_exception<F>(&self, handler: F) -> &Self
    where
        F: FnOnce(&TaskError) + Send + 'static,
    {
        if !self.cell.root().handlers().set_exception(Box::new(handler)) {
            warn!("Exception handler already set on this task chain; ignoring");
        }
        self
    }

    /// Handler invoked once if this chain is cancelled.
    pub fn on_cancel<F>(&self, handler: F) -> &Self
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.cell.root().handlers().set_cancel(Box::new(handler)) {
            warn!("Cancel handler already set on this task chain; ignoring");
        }
        self
    }

    /// Run `next` on the same executor once this unit succeeds.
    ///
    /// A failure or cancellation of this unit passes straight through to the
    /// returned result without running `next`.
    pub fn then<U, F>(&self, next: F) -> TaskResult<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T, &CancelToken) -> Result<U, BoxError> + Send + 'static,
    {
        let predecessor = Arc::clone(&self.cell);
        let link: Arc<dyn ChainLink> = predecessor.clone();
        self.executor
            .enqueue(Some(link), move |token| match predecessor.wait_with(token) {
                Err(Interrupted) => Outcome::Cancelled,
                Ok(Ok(value)) => Outcome::from_work(next(value, token)),
                Ok(Err(TaskError::Cancelled)) => Outcome::Cancelled,
                Ok(Err(err)) => Outcome::Propagated(err),
            })
    }
}

impl<T> fmt::Debug for TaskResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskResult")
            .field("id", &self.cell.id)
            .field("executor", &self.executor.name())
            .finish()
    }
}
