// src/screens/repaint.rs
//! Coalescing repaint requests.

use std::mem;

use parking_lot::{Condvar, Mutex};

use crate::tasks::{CANCEL_POLL, CancelToken, Interrupted};

/// Counting permit for the render loop.
///
/// Starts with one permit so the first pass happens without a request. The
/// loop drains every available permit at once, so any number of requests made
/// while a pass is running collapse into a single following pass.
pub(crate) struct RepaintSignal {
    permits: Mutex<usize>,
    available: Condvar,
}

impl RepaintSignal {
    pub(crate) fn new() -> Self {
        Self {
            permits: Mutex::new(1),
            available: Condvar::new(),
        }
    }

    pub(crate) fn request(&self) {
        let mut permits = self.permits.lock();
        *permits = permits.saturating_add(1);
        self.available.notify_one();
    }

    /// Wait for at least one permit, then take all of them.
    pub(crate) fn acquire_all(&self, token: &CancelToken) -> Result<usize, Interrupted> {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            token.check()?;
            self.available.wait_for(&mut permits, CANCEL_POLL);
        }
        Ok(mem::take(&mut *permits))
    }

    pub(crate) fn pending(&self) -> usize {
        *self.permits.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_initial_permit() {
        let signal = RepaintSignal::new();
        assert_eq!(signal.acquire_all(&CancelToken::new()), Ok(1));
        assert_eq!(signal.pending(), 0);
    }

    #[test]
    fn test_requests_coalesce() {
        let signal = RepaintSignal::new();
        let token = CancelToken::new();
        signal.acquire_all(&token).unwrap();
        for _ in 0..5 {
            signal.request();
        }
        assert_eq!(signal.acquire_all(&token), Ok(5));
        assert_eq!(signal.pending(), 0);
    }

    #[test]
    fn test_acquire_wakes_on_request() {
        let signal = Arc::new(RepaintSignal::new());
        let token = CancelToken::new();
        signal.acquire_all(&token).unwrap();
        let waiter = signal.clone();
        let handle = thread::spawn(move || waiter.acquire_all(&CancelToken::new()));
        thread::sleep(Duration::from_millis(20));
        signal.request();
        assert_eq!(handle.join().unwrap(), Ok(1));
    }

    #[test]
    fn test_acquire_interrupted() {
        let signal = RepaintSignal::new();
        let token = CancelToken::new();
        signal.acquire_all(&token).unwrap();
        token.cancel();
        assert_eq!(signal.acquire_all(&token), Err(Interrupted));
    }
}
