//! Monitor: one mutex plus two condition variables
//!
//! All state mutation happens under the mutex. Callers park on exactly one of
//! the two conditions; the lock is released while parked and predicates are
//! re-evaluated under the lock after every wakeup.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use log::trace;

use crate::error::{QueueError, Result};

use super::cancel::{CancelToken, Wake};

/// The two wait registries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// Woken when bytes are removed or the buffer is resized
    SpaceAvailable,
    /// Woken when bytes are added or the buffer is resized
    DataAvailable,
}

impl WaitCondition {
    pub fn describe(&self) -> &'static str {
        match self {
            WaitCondition::SpaceAvailable => "space",
            WaitCondition::DataAvailable => "data",
        }
    }
}

/// Mutex-guarded state with space/data condition variables
#[derive(Debug, Default)]
pub struct Monitor<T> {
    state: Mutex<T>,
    space_available: Condvar,
    data_available: Condvar,
}

impl<T> Monitor<T> {
    pub fn new(state: T) -> Self {
        Self {
            state: Mutex::new(state),
            space_available: Condvar::new(),
            data_available: Condvar::new(),
        }
    }

    /// Acquire the state lock.
    ///
    /// A panic while holding the lock cannot leave the ring half-written (frames
    /// roll back before returning errors), so poisoning is recovered from.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn condvar(&self, condition: WaitCondition) -> &Condvar {
        match condition {
            WaitCondition::SpaceAvailable => &self.space_available,
            WaitCondition::DataAvailable => &self.data_available,
        }
    }

    /// Wake every caller parked on `condition`
    pub fn notify(&self, condition: WaitCondition) {
        self.condvar(condition).notify_all();
    }

    /// Wake every caller parked on either condition
    pub fn notify_all_conditions(&self) {
        self.space_available.notify_all();
        self.data_available.notify_all();
    }
}

impl<T: Send + 'static> Monitor<T> {
    /// Park on `condition` while `must_wait` holds.
    ///
    /// `must_wait` runs under the lock before parking and after every wakeup;
    /// an `Err` from it aborts the wait. `on_park` runs once, the first time the
    /// caller actually has to park. With a cancel token, cancellation observed
    /// before the condition holds yields `Interrupted`.
    pub fn wait_while<'a, F, P>(
        self: &'a Arc<Self>,
        mut guard: MutexGuard<'a, T>,
        condition: WaitCondition,
        cancel: Option<&CancelToken>,
        mut must_wait: F,
        on_park: P,
    ) -> Result<MutexGuard<'a, T>>
    where
        F: FnMut(&T) -> Result<bool>,
        P: FnOnce(),
    {
        let mut on_park = Some(on_park);
        let mut registration = None;

        loop {
            if !must_wait(&*guard)? {
                return Ok(guard);
            }

            if let Some(token) = cancel {
                if registration.is_none() {
                    let waker: Arc<dyn Wake> = self.clone();
                    registration = Some(token.register(waker));
                }
                if token.is_cancelled() {
                    trace!("wait for {} interrupted", condition.describe());
                    return Err(QueueError::interrupted(condition.describe()));
                }
            }

            if let Some(on_park) = on_park.take() {
                on_park();
            }

            trace!("parking until {} is available", condition.describe());
            guard = self
                .condvar(condition)
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl<T: Send> Wake for Monitor<T> {
    fn wake_all(&self) {
        // Cycle the lock so a caller between its cancel check and parking
        // is already parked when the notification goes out.
        drop(self.lock());
        self.notify_all_conditions();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};

    #[test]
    fn test_wait_returns_immediately_when_ready() {
        let monitor = Arc::new(Monitor::new(5u32));
        let guard = monitor.lock();
        let mut parked = false;
        let guard = monitor
            .wait_while(guard, WaitCondition::DataAvailable, None, |v| Ok(*v == 0), || parked = true)
            .unwrap();
        assert_eq!(*guard, 5);
        drop(guard);
        assert!(!parked);
    }

    #[test]
    fn test_wait_woken_by_notify() {
        let monitor = Arc::new(Monitor::new(0u32));

        let waiter = {
            let monitor = monitor.clone();
            thread::spawn(move || {
                let guard = monitor.lock();
                let guard = monitor
                    .wait_while(guard, WaitCondition::DataAvailable, None, |v| Ok(*v == 0), || {})
                    .unwrap();
                let value = *guard;
                value
            })
        };

        thread::sleep(Duration::from_millis(20));
        *monitor.lock() = 3;
        monitor.notify(WaitCondition::DataAvailable);

        assert_eq!(waiter.join().unwrap(), 3);
    }

    #[test]
    fn test_wait_interrupted_by_cancel() {
        let monitor = Arc::new(Monitor::new(0u32));
        let token = CancelToken::new();

        let waiter = {
            let monitor = monitor.clone();
            let token = token.clone();
            thread::spawn(move || {
                let guard = monitor.lock();
                let result = monitor
                    .wait_while(guard, WaitCondition::SpaceAvailable, Some(&token), |v| Ok(*v == 0), || {})
                    .map(|_| ());
                result
            })
        };

        thread::sleep(Duration::from_millis(20));
        token.cancel();

        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(QueueError::Interrupted { .. })));
        assert_eq!(token.parked_count(), 0);
    }

    #[test]
    fn test_predicate_error_aborts_wait() {
        let monitor = Arc::new(Monitor::new(0u32));
        let guard = monitor.lock();
        let result = monitor.wait_while(
            guard,
            WaitCondition::SpaceAvailable,
            None,
            |_| Err(QueueError::message_too_large(9, 8)),
            || {},
        );
        assert!(matches!(result, Err(QueueError::MessageTooLarge { .. })));
    }
}
