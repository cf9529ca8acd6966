// src/tasks/mod.rs
//! Background work for screens: single-worker executors, chainable results
//! and cooperative cancellation.

mod cancel;
pub mod command;
mod executor;
mod registry;
mod result;

pub(crate) use cancel::{CANCEL_POLL, lock_interruptibly};
pub use cancel::{CancelToken, Interrupted};
pub use executor::TaskExecutor;
pub use registry::ExecutorRegistry;
pub use result::{BoxError, SharedError, TaskError, TaskPanic, TaskResult, TaskState};
