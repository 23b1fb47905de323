//! Counting semaphore used to serialize repository memory access.
//!
//! # Responsibility
//! - Admit at most `permits` concurrent holders.
//! - Hand out RAII permits so every `wait` is paired with exactly one `signal`.
//!
//! # Invariants
//! - The available count never exceeds the configured permit count.
//! - Waiters block on a condition variable, never spin.

use parking_lot::{Condvar, Mutex};

/// Blocking counting semaphore.
///
/// Configured with one permit it behaves as a mutex whose ownership is not
/// tied to a lexical scope, which is what the persistent repository needs to
/// bracket multi-step memory updates.
#[derive(Debug)]
pub struct CountingSemaphore {
    available: Mutex<usize>,
    capacity: usize,
    released: Condvar,
}

impl CountingSemaphore {
    /// Creates a semaphore with `permits` initially available.
    pub fn new(permits: usize) -> Self {
        Self {
            available: Mutex::new(permits),
            capacity: permits,
            released: Condvar::new(),
        }
    }

    /// Blocks until a permit is available and takes it.
    pub fn wait(&self) {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
    }

    /// Takes a permit without blocking. Returns `false` when none is free.
    pub fn try_wait(&self) -> bool {
        let mut available = self.available.lock();
        if *available == 0 {
            return false;
        }
        *available -= 1;
        true
    }

    /// Returns one permit and wakes a single waiter.
    ///
    /// Signals beyond the configured capacity are ignored.
    pub fn signal(&self) {
        let mut available = self.available.lock();
        if *available < self.capacity {
            *available += 1;
        }
        drop(available);
        self.released.notify_one();
    }

    /// Blocks for a permit and returns a guard that signals on drop.
    pub fn acquire(&self) -> SemaphorePermit<'_> {
        self.wait();
        SemaphorePermit { semaphore: self }
    }

    /// Number of permits currently free.
    pub fn available_permits(&self) -> usize {
        *self.available.lock()
    }
}

/// Permit returned by [`CountingSemaphore::acquire`].
#[must_use = "dropping the permit releases the semaphore immediately"]
pub struct SemaphorePermit<'a> {
    semaphore: &'a CountingSemaphore,
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.semaphore.signal();
    }
}

#[cfg(test)]
mod tests {
    use super::CountingSemaphore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn permit_is_returned_on_drop() {
        let semaphore = CountingSemaphore::new(1);

        {
            let _permit = semaphore.acquire();
            assert_eq!(semaphore.available_permits(), 0);
            assert!(!semaphore.try_wait());
        }

        assert_eq!(semaphore.available_permits(), 1);
    }

    #[test]
    fn signal_never_exceeds_capacity() {
        let semaphore = CountingSemaphore::new(2);
        semaphore.signal();
        semaphore.signal();
        assert_eq!(semaphore.available_permits(), 2);
    }

    #[test]
    fn single_permit_serializes_holders() {
        let semaphore = Arc::new(CountingSemaphore::new(1));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let semaphore = Arc::clone(&semaphore);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    for _ in 0..20 {
                        let _permit = semaphore.acquire();
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_micros(50));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker thread should not panic");
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(semaphore.available_permits(), 1);
    }

    #[test]
    fn wait_blocks_until_signal() {
        let semaphore = Arc::new(CountingSemaphore::new(1));
        semaphore.wait();

        let waiter = {
            let semaphore = Arc::clone(&semaphore);
            thread::spawn(move || {
                semaphore.wait();
                semaphore.signal();
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());
        semaphore.signal();
        waiter.join().expect("waiter should finish after signal");
        assert_eq!(semaphore.available_permits(), 1);
    }
}
