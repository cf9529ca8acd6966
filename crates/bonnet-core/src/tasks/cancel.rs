// src/tasks/cancel.rs
//! Cooperative cancellation for running task units.
//!
//! Every unit receives a [`CancelToken`]. Cancelling the unit's result flips
//! the token; the unit notices through [`CancelToken::check`],
//! [`CancelToken::sleep`] or an interruptible lock acquisition and bails out
//! with [`Interrupted`].

use std::cell::RefCell;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, ReentrantMutex, ReentrantMutexGuard};
use thiserror::Error;

/// How often blocked waits re-check their token.
pub(crate) const CANCEL_POLL: Duration = Duration::from_millis(10);

/// Returned when a wait is cut short by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("interrupted by cancellation")]
pub struct Interrupted;

#[derive(Default)]
struct TokenInner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Cancellation flag shared between a task unit and whoever cancels it.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

thread_local! {
    static CURRENT: RefCell<Option<CancelToken>> = const { RefCell::new(None) };
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag cancellation and wake any [`sleep`](Self::sleep) in progress.
    pub fn cancel(&self) {
        *self.inner.cancelled.lock() = true;
        self.inner.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, returning early with [`Interrupted`] on cancellation.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let deadline = Instant::now() + duration;
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            if self
                .inner
                .wake
                .wait_until(&mut cancelled, deadline)
                .timed_out()
            {
                return if *cancelled { Err(Interrupted) } else { Ok(()) };
            }
        }
        Err(Interrupted)
    }

    /// Token of the task unit running on this thread, if any.
    pub fn current() -> Option<CancelToken> {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Install this token as the thread's current token until the scope drops.
    pub(crate) fn enter(&self) -> TokenScope {
        let previous = CURRENT.with(|current| current.replace(Some(self.clone())));
        TokenScope { previous }
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

pub(crate) struct TokenScope {
    previous: Option<CancelToken>,
}

impl Drop for TokenScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

/// Lock `lock`, giving up if the task running on this thread is cancelled.
///
/// Threads that are not running a task unit block like a plain `lock()`.
pub(crate) fn lock_interruptibly<T>(lock: &ReentrantMutex<T>) -> Result<ReentrantMutexGuard<'_, T>, Interrupted> {
    let Some(token) = CancelToken::current() else {
        return Ok(lock.lock());
    };
    loop {
        if let Some(guard) = lock.try_lock_for(CANCEL_POLL) {
            return Ok(guard);
        }
        token.check()?;
    }
}
