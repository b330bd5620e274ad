//! A single-shot broadcast signal.
//!
//! Once fired it stays fired: every thread blocked in [`Signal::wait`] is
//! released, and every later waiter returns immediately. Async waiters are
//! woken through the wakers they registered while the signal was unfired.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

#[derive(Debug, Default)]
pub(crate) struct Signal {
    fired: AtomicBool,
    inner: Mutex<Inner>,
    cond: Condvar,
}

#[derive(Debug, Default)]
struct Inner {
    fired: bool,
    // Every pending poller keeps its own waker; waking only the last one
    // strands the other consumers.
    wakers: Vec<Waker>,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Fires the signal. Firing twice is harmless.
    pub(crate) fn fire(&self) {
        let wakers = {
            let mut inner = self.lock();
            if inner.fired {
                return;
            }
            inner.fired = true;
            self.fired.store(true, Ordering::Release);
            std::mem::take(&mut inner.wakers)
        };
        self.cond.notify_all();
        for waker in wakers {
            waker.wake();
        }
    }

    /// Blocks the calling thread until the signal fires.
    pub(crate) fn wait(&self) {
        if self.is_fired() {
            return;
        }
        let mut inner = self.lock();
        while !inner.fired {
            inner = self.cond.wait(inner).unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn poll(&self, cx: &mut Context<'_>) -> Poll<()> {
        if self.is_fired() {
            return Poll::Ready(());
        }
        let mut inner = self.lock();
        if inner.fired {
            return Poll::Ready(());
        }
        if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            inner.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
