//! Running work on its own thread behind a promise.
use crate::{spawn as config, Error, Promise, Resolution};

/// Runs `work` on a new thread and returns a promise for its result.
///
/// A returned promise is adopted, so `work` may itself hand back a promise.
/// If the thread cannot be started the promise is rejected with
/// [`Error::Spawn`].
///
/// # Examples
///
/// ```
/// use promise_kit::{task, Resolution};
/// let answer = task::spawn(|| Ok(Resolution::Value(6 * 7)));
/// assert_eq!(answer.wait().unwrap(), 42);
/// ```
pub fn spawn<T, F>(work: F) -> Promise<T>
where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Result<Resolution<T>, Error> + Send + 'static,
{
    let promise = Promise::pending();
    let target = promise.clone();
    if let Err(err) = config::spawn("task", move || target.resolve_blocking(work())) {
        promise.reject(err);
    }
    promise
}

#[cfg(test)]
mod tests {
    use super::spawn;
    use crate::{Deferred, Error, Promise, Resolution, Settle};
    use std::sync::mpsc::channel;

    #[test]
    fn test_spawn_fulfills() {
        let promise = spawn(|| Ok(Resolution::Value(String::from("done"))));
        assert_eq!(promise.wait().unwrap(), "done");
    }

    #[test]
    fn test_spawn_rejects() {
        let promise = spawn::<i32, _>(|| Err(Error::msg("failed")));
        assert_eq!(promise.wait().unwrap_err().to_string(), "failed");
    }

    #[test]
    fn test_spawn_returns_immediately() {
        let (tx, rx) = channel::<()>();
        let promise = spawn(move || {
            rx.recv().unwrap();
            Ok(Resolution::Value(1))
        });
        assert!(promise.try_outcome().is_none());
        tx.send(()).unwrap();
        assert_eq!(promise.wait().unwrap(), 1);
    }

    #[test]
    fn test_spawn_adopts_returned_promise() {
        let inner = Deferred::<i32>::new();
        let handed_back = inner.promise();
        let promise = spawn(move || Ok(Resolution::Promise(handed_back)));
        inner.fulfill(3);
        assert_eq!(promise.wait().unwrap(), 3);
        let rejected = spawn(|| Ok(Resolution::Promise(Promise::<i32>::rejected(Error::msg("inner")))));
        assert_eq!(rejected.wait().unwrap_err().to_string(), "inner");
    }
}
