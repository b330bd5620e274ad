use crate::{Error, Promise, Resolution, Resolver, Settle};
use std::ops::Deref;

/// A pending promise together with the authority to settle it.
///
/// The observation side is handed out with [`promise`](Self::promise) or
/// used directly, since `Deferred` derefs to its [`Promise`].
///
/// # Examples
///
/// ```
/// use promise_kit::{Deferred, Settle};
/// use futures::executor::block_on;
/// use std::thread;
/// let deferred = Deferred::<String>::new();
/// let consumer = deferred.promise();
/// let task1 = thread::spawn(move || block_on(async {
///     println!("Received {:?}", consumer.await);
/// }));
/// deferred.fulfill("Hi".into());
/// task1.join().expect("The task1 thread has panicked.");
/// ```
#[derive(Debug)]
pub struct Deferred<T> {
    resolver: Resolver<T>,
}

impl<T> Deferred<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            resolver: Resolver::new(Promise::pending()),
        }
    }

    /// Another handle to the wrapped promise.
    pub fn promise(&self) -> Promise<T> {
        self.resolver.promise().clone()
    }

    /// Splits into the settlement authority and the observation handle, so
    /// the authority can move to the producing thread.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_kit::{Deferred, Error, Settle};
    /// use std::thread;
    /// let (resolver, promise) = Deferred::<()>::new().split();
    /// thread::spawn(move || resolver.reject(Error::msg("💥")));
    /// assert_eq!(promise.wait().unwrap_err().to_string(), "💥");
    /// ```
    pub fn split(self) -> (Resolver<T>, Promise<T>) {
        let promise = self.promise();
        (self.resolver, promise)
    }
}

impl<T> Default for Deferred<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for Deferred<T> {
    type Target = Promise<T>;

    fn deref(&self) -> &Promise<T> {
        self.resolver.promise()
    }
}

impl<T> Settle<T> for Deferred<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn resolve(&self, resolution: Resolution<T>) {
        self.resolver.resolve(resolution)
    }

    fn reject(&self, reason: Error) {
        self.resolver.reject(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::Deferred;
    use crate::{Error, Resolution, Settle, State};
    use futures::executor::block_on;
    use std::thread;

    #[test]
    fn test_deferred_resolve() {
        let op = Deferred::<String>::new();
        let op_a = op.promise();
        let task1 = thread::spawn(move || block_on(async { op_a.await.unwrap() }));
        let task2 = thread::spawn(move || op.fulfill(String::from("🍓")));
        task2.join().expect("The task2 thread has panicked");
        assert_eq!(task1.join().expect("The task1 thread has panicked"), "🍓");
    }

    #[test]
    fn test_deferred_reject() {
        let (resolver, promise) = Deferred::<String>::new().split();
        let task = thread::spawn(move || resolver.reject(Error::msg("reject!!")));
        task.join().expect("The task thread has panicked");
        assert_eq!(promise.wait().unwrap_err().to_string(), "reject!!");
    }

    #[test]
    fn test_deferred_delegates_observation() {
        let deferred = Deferred::<i32>::new();
        let doubled = deferred.then(|v| Ok(Resolution::Value(v * 2)));
        let logged = deferred.finally(|| Ok(()));
        assert_eq!(deferred.state(), State::Pending);
        deferred.fulfill(4);
        deferred.fulfill(5);
        assert_eq!(doubled.wait().unwrap(), 8);
        assert_eq!(logged.wait().unwrap(), 4);
        assert_eq!(deferred.wait().unwrap(), 4);
    }

    #[test]
    fn test_abandoned_deferred_stays_pending() {
        let deferred = Deferred::<i32>::new();
        let promise = deferred.promise();
        drop(deferred);
        assert_eq!(promise.state(), State::Pending);
        assert!(promise.try_outcome().is_none());
    }

    #[test]
    fn test_deferred_adopts_promise() {
        let source = Deferred::<i32>::new();
        let deferred = Deferred::<i32>::new();
        deferred.resolve(Resolution::Promise(source.promise()));
        source.fulfill(11);
        assert_eq!(deferred.wait().unwrap(), 11);
    }
}
