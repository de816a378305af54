use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

struct Slot<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

/// Single-assignment result handed back by operations that may be deferred.
///
/// Clones share the same slot. The first `resolve` wins and wakes every
/// blocked reader; later calls are ignored. A future that is never resolved
/// simply stays empty: there is no cancellation.
pub struct Future<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for Future<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Future")
            .field("available", &self.is_available())
            .finish()
    }
}

impl<T> Future<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Slot {
                value: Mutex::new(None),
                ready: Condvar::new(),
            }),
        }
    }

    /// Stores `value` if nothing was stored yet.
    ///
    /// Returns `false` when the future was already resolved.
    pub fn resolve(&self, value: T) -> bool {
        let mut guard = self.slot.value.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            return false;
        }
        *guard = Some(value);
        drop(guard);

        self.slot.ready.notify_all();
        true
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        self.slot
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<T: Clone> Future<T> {
    /// Non-blocking read.
    pub fn value(&self) -> Option<T> {
        self.slot
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Blocks until the future is resolved.
    ///
    /// Deadlocks if the resolving operation is queued on the calling thread.
    pub fn wait(&self) -> T {
        let mut guard = self.slot.value.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(v) = guard.as_ref() {
                return v.clone();
            }
            guard = self
                .slot
                .ready
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks for at most `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.slot.value.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(v) = guard.as_ref() {
                return Some(v.clone());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let (g, _) = self
                .slot
                .ready
                .wait_timeout(guard, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            guard = g;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn starts_unresolved() {
        let f: Future<u32> = Future::new();
        assert!(!f.is_available());
        assert_eq!(f.value(), None);
    }

    #[test]
    fn first_resolve_wins() {
        let f = Future::new();
        assert!(f.resolve(1));
        assert!(!f.resolve(2));
        assert_eq!(f.value(), Some(1));
    }

    #[test]
    fn clones_share_the_slot() {
        let f = Future::new();
        let g = f.clone();
        g.resolve("ready");
        assert!(f.is_available());
        assert_eq!(f.wait(), "ready");
    }

    #[test]
    fn wait_wakes_on_resolve_from_other_thread() {
        let f = Future::new();
        let g = f.clone();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            g.resolve(42u64);
        });
        assert_eq!(f.wait(), 42);
        t.join().unwrap();
    }

    #[test]
    fn wait_timeout_expires_when_never_resolved() {
        let f: Future<u8> = Future::new();
        assert_eq!(f.wait_timeout(Duration::from_millis(5)), None);
    }
}
