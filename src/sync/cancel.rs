//! Cancellation of parked callers
//!
//! A [`CancelToken`] plays the role of a pending signal: once cancelled, every
//! queue operation parked with that token returns `Interrupted`. Cancelling
//! wakes the monitors the token's holders are currently parked on, so the
//! interruption is observed promptly instead of at the next unrelated wakeup.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};

/// Something parked callers can be woken from
pub trait Wake: Send + Sync {
    /// Wake every caller parked on this object so it re-evaluates its state
    fn wake_all(&self);
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    parked: Mutex<Vec<(u64, Arc<dyn Wake>)>>,
}

/// Shared, clonable cancellation flag
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Mark the token cancelled and wake everything parked under it
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);

        // Never wake while holding the registry lock: wakers take monitor locks,
        // and parked callers register while holding theirs.
        let parked: Vec<Arc<dyn Wake>> = self
            .inner
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, waker)| waker.clone())
            .collect();

        for waker in parked {
            waker.wake_all();
        }
    }

    /// Register `waker` to be woken on cancellation for the guard's lifetime.
    ///
    /// Register before checking [`is_cancelled`](Self::is_cancelled): either the
    /// canceller sees the registration or the caller sees the flag.
    pub fn register(&self, waker: Arc<dyn Wake>) -> Registration {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, waker));
        Registration {
            token: self.clone(),
            id,
        }
    }

    /// A token cancelled whenever `self` is, and also cancellable on its own.
    ///
    /// The link holds for the lifetime of the returned [`Registration`].
    pub fn child(&self) -> (CancelToken, Registration) {
        let child = CancelToken::new();
        let link = self.register(Arc::new(Propagate(child.clone())));
        if self.is_cancelled() {
            child.cancel();
        }
        (child, link)
    }

    /// Number of live registrations
    pub fn parked_count(&self) -> usize {
        self.inner
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Forwards a parent's cancellation to a child token
struct Propagate(CancelToken);

impl Wake for Propagate {
    fn wake_all(&self) {
        self.0.cancel();
    }
}

/// Removes its waker from the token when dropped
#[must_use]
pub struct Registration {
    token: CancelToken,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.token
            .inner
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _)| *id != self.id);
    }
}
