use crate::error::PromiseId;
use crate::signal::Signal;
use crate::{spawn, Error, Settle};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::task::{Context, Poll};

const PENDING: u8 = 0;
const FULFILLED: u8 = 1;
const REJECTED: u8 = 2;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Where a promise is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Pending,
    Fulfilled,
    Rejected,
}

/// A candidate settlement value: either a plain value or another promise
/// whose eventual outcome is adopted.
#[derive(Debug)]
pub enum Resolution<T> {
    Value(T),
    Promise(Promise<T>),
}

impl<T> From<T> for Resolution<T> {
    fn from(value: T) -> Self {
        Resolution::Value(value)
    }
}

impl<T: Clone> Resolution<T> {
    /// Blocks until the resolution has a plain outcome.
    pub(crate) fn into_result(self) -> Result<T, Error> {
        match self {
            Resolution::Value(value) => Ok(value),
            Resolution::Promise(promise) => promise.wait(),
        }
    }
}

struct Inner<T> {
    id: PromiseId,
    status: AtomicU8,
    outcome: OnceLock<Result<T, Error>>,
    signal: Signal,
    // The promise this one is currently adopting, if any.
    follows: Mutex<Option<Weak<Inner<T>>>>,
}

impl<T> Inner<T> {
    fn follows(&self) -> MutexGuard<'_, Option<Weak<Inner<T>>>> {
        self.follows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A value that is settled exactly once and observed by any number of
/// consumers, before or after settlement.
///
/// `Promise` is a handle: cloning it yields another view of the same state.
///
/// # Examples
///
/// ```
/// use promise_kit::{Promise, Resolution};
/// let doubled = Promise::fulfilled(21).then(|v| Ok(Resolution::Value(v * 2)));
/// assert_eq!(doubled.wait().unwrap(), 42);
/// ```
pub struct Promise<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

impl<T> Promise<T> {
    pub(crate) fn pending() -> Self {
        Self {
            inner: Arc::new(Inner {
                id: PromiseId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
                status: AtomicU8::new(PENDING),
                outcome: OnceLock::new(),
                signal: Signal::new(),
                follows: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> PromiseId {
        self.inner.id
    }

    /// The current state. A settled state is final.
    ///
    /// Reads the published outcome rather than the transition guard, so a
    /// settled state always comes with an outcome from
    /// [`try_outcome`](Self::try_outcome).
    pub fn state(&self) -> State {
        match self.inner.outcome.get() {
            None => State::Pending,
            Some(Ok(_)) => State::Fulfilled,
            Some(Err(_)) => State::Rejected,
        }
    }

    /// Whether both handles observe the same promise.
    pub fn ptr_eq(&self, other: &Promise<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Attempts the one transition out of pending. Returns `false` when
    /// another settlement already won.
    pub(crate) fn settle(&self, outcome: Result<T, Error>) -> bool {
        let next = if outcome.is_ok() { FULFILLED } else { REJECTED };
        if self
            .inner
            .status
            .compare_exchange(PENDING, next, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        // Only the compare-and-swap winner reaches this point, so the cell is empty.
        let _ = self.inner.outcome.set(outcome);
        self.inner.follows().take();
        self.inner.signal.fire();
        tracing::trace!(promise = %self.inner.id, state = ?self.state(), "promise settled");
        true
    }

    pub(crate) fn fulfill(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    pub(crate) fn reject(&self, reason: Error) -> bool {
        self.settle(Err(reason))
    }

    fn reject_cycle(&self) {
        tracing::debug!(promise = %self.inner.id, "chaining cycle detected");
        self.reject(Error::ChainingCycle(self.inner.id));
    }

    /// Records that this promise adopts `source` and checks that `source`
    /// does not lead back here through pending adoptions. On a cycle the
    /// promise is rejected and `false` is returned.
    fn link(&self, source: &Promise<T>) -> bool {
        if source.ptr_eq(self) {
            self.reject_cycle();
            return false;
        }
        *self.inner.follows() = Some(Arc::downgrade(&source.inner));
        // The link is published before the walk, so of two promises adopting
        // each other concurrently at least one sees the other's link.
        if self.is_reachable_from(source) {
            self.inner.follows().take();
            self.reject_cycle();
            return false;
        }
        true
    }

    fn is_reachable_from(&self, start: &Promise<T>) -> bool {
        let mut visited: Vec<*const Inner<T>> = Vec::new();
        let mut cursor = Some(start.inner.clone());
        while let Some(node) = cursor {
            if Arc::ptr_eq(&node, &self.inner) {
                return true;
            }
            let addr = Arc::as_ptr(&node);
            if visited.contains(&addr) {
                return false;
            }
            visited.push(addr);
            let next = node.follows().as_ref().and_then(Weak::upgrade);
            cursor = next;
        }
        false
    }
}

impl<T: Clone> Promise<T> {
    fn published(&self) -> Result<T, Error> {
        match self.inner.outcome.get() {
            Some(outcome) => outcome.clone(),
            None => unreachable!("promise {} signalled before publishing", self.inner.id),
        }
    }

    /// Blocks until the promise settles and returns its outcome.
    ///
    /// Returns immediately if the promise is already settled. Any number of
    /// threads may wait at once.
    pub fn wait(&self) -> Result<T, Error> {
        self.inner.signal.wait();
        self.published()
    }

    /// The outcome, if the promise has settled.
    pub fn try_outcome(&self) -> Option<Result<T, Error>> {
        self.inner.outcome.get().cloned()
    }
}

impl<T> Promise<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a promise and hands its settlement capability to `executor`,
    /// which runs on the calling thread.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_kit::{Promise, Settle};
    /// use std::thread;
    /// let promise = Promise::new(|resolver| {
    ///     thread::spawn(move || resolver.fulfill(String::from("🍓")));
    /// });
    /// assert_eq!(promise.wait().unwrap(), "🍓");
    /// ```
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Resolver<T>),
    {
        let promise = Self::pending();
        executor(Resolver {
            promise: promise.clone(),
        });
        promise
    }

    /// A promise already fulfilled with `value`.
    pub fn fulfilled(value: T) -> Self {
        let promise = Self::pending();
        promise.fulfill(value);
        promise
    }

    /// A promise already rejected with `reason`.
    pub fn rejected(reason: Error) -> Self {
        let promise = Self::pending();
        promise.reject(reason);
        promise
    }

    /// A promise settled from `resolution`, adopting it if it is a promise.
    pub fn from_resolution(resolution: Resolution<T>) -> Self {
        Self::new(|resolver| resolver.resolve(resolution))
    }

    /// Settles from a handler's result, blocking the current task while a
    /// returned promise is pending. Used inside spawned tasks only.
    pub(crate) fn resolve_blocking(&self, result: Result<Resolution<T>, Error>) {
        match result {
            Err(reason) => {
                self.reject(reason);
            }
            Ok(Resolution::Value(value)) => {
                self.fulfill(value);
            }
            Ok(Resolution::Promise(source)) => {
                if self.state() == State::Pending && self.link(&source) {
                    self.settle(source.wait());
                }
            }
        }
    }

    /// Settles from `resolution` without blocking the caller. A pending
    /// promise is adopted on its own task.
    pub(crate) fn resolve_detached(&self, resolution: Resolution<T>) {
        let source = match resolution {
            Resolution::Value(value) => {
                self.fulfill(value);
                return;
            }
            Resolution::Promise(source) => source,
        };
        if self.state() != State::Pending || !self.link(&source) {
            return;
        }
        if let Some(outcome) = source.try_outcome() {
            self.settle(outcome);
            return;
        }
        let target = self.clone();
        if let Err(err) = spawn::spawn("adopt", move || {
            target.settle(source.wait());
        }) {
            self.reject(err);
        }
    }

    fn chain<U, F>(&self, role: &'static str, continuation: F) -> Promise<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(Result<T, Error>) -> Result<Resolution<U>, Error> + Send + 'static,
    {
        let derived = Promise::pending();
        let source = self.clone();
        let target = derived.clone();
        if let Err(err) = spawn::spawn(role, move || {
            let outcome = source.wait();
            target.resolve_blocking(continuation(outcome));
        }) {
            derived.reject(err);
        }
        derived
    }

    /// Runs `on_fulfilled` with the value once this promise fulfills.
    ///
    /// A rejection passes through to the returned promise untouched. A panic
    /// inside the handler is not caught: it ends the continuation thread and
    /// leaves the returned promise pending.
    pub fn then<U, F>(&self, on_fulfilled: F) -> Promise<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Result<Resolution<U>, Error> + Send + 'static,
    {
        self.chain("then", move |outcome| on_fulfilled(outcome?))
    }

    /// Runs `on_rejected` with the reason once this promise rejects. A value
    /// passes through untouched.
    pub fn catch<F>(&self, on_rejected: F) -> Promise<T>
    where
        F: FnOnce(Error) -> Result<Resolution<T>, Error> + Send + 'static,
    {
        self.chain("catch", move |outcome| match outcome {
            Ok(value) => Ok(Resolution::Value(value)),
            Err(reason) => on_rejected(reason),
        })
    }

    pub fn then_catch<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Result<Resolution<U>, Error> + Send + 'static,
        R: FnOnce(Error) -> Result<Resolution<U>, Error> + Send + 'static,
    {
        self.chain("then-catch", move |outcome| match outcome {
            Ok(value) => on_fulfilled(value),
            Err(reason) => on_rejected(reason),
        })
    }

    /// Runs `on_settle` after either outcome. The returned promise carries
    /// the original outcome, unless `on_settle` fails, in which case it is
    /// rejected with that failure.
    pub fn finally<F>(&self, on_settle: F) -> Promise<T>
    where
        F: FnOnce() -> Result<(), Error> + Send + 'static,
    {
        self.chain("finally", move |outcome| {
            on_settle()?;
            outcome.map(Resolution::Value)
        })
    }
}

impl<T: Clone> Future for Promise<T> {
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.inner.signal.poll(cx) {
            Poll::Ready(()) => Poll::Ready(self.published()),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// The authority to settle one promise.
///
/// Handed to the executor of [`Promise::new`] and produced by
/// [`Deferred::split`](crate::Deferred::split). Clones share the authority;
/// only the first settlement takes effect.
#[derive(Debug)]
pub struct Resolver<T> {
    promise: Promise<T>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T> Resolver<T> {
    pub(crate) fn new(promise: Promise<T>) -> Self {
        Self { promise }
    }

    /// The promise this resolver settles.
    pub fn promise(&self) -> &Promise<T> {
        &self.promise
    }
}

impl<T> Settle<T> for Resolver<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn resolve(&self, resolution: Resolution<T>) {
        self.promise.resolve_detached(resolution);
    }

    fn reject(&self, reason: Error) {
        self.promise.reject(reason);
    }
}
