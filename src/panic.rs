//! Turning panics into rejections.
use crate::{Error, Promise, Resolution};
use std::any::Any;
use std::error::Error as StdError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_FAULT: AtomicU64 = AtomicU64::new(1);

/// Runs `work` on the calling thread. A panic is caught and becomes the
/// rejection reason of the returned promise.
///
/// `work` may return a plain value or a [`Resolution`]; a returned promise is
/// adopted like any other resolution.
///
/// The panic payload maps to a reason as follows: an [`Error`] passes
/// through, other error values (boxed, shared or `std::io::Error`) become
/// [`Error::Custom`], text becomes [`Error::Message`], anything else becomes
/// [`Error::Panicked`] tagged with a process-unique fault number. The panic
/// hook still runs as usual.
///
/// # Examples
///
/// ```
/// use promise_kit::panic::promisify;
/// let promise = promisify::<i32, _, _>(|| -> i32 { panic!("💥") });
/// assert_eq!(promise.wait().unwrap_err().to_string(), "💥");
/// ```
pub fn promisify<T, F, R>(work: F) -> Promise<T>
where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> R,
    R: Into<Resolution<T>>,
{
    match catch_unwind(AssertUnwindSafe(work)) {
        Ok(value) => Promise::from_resolution(value.into()),
        Err(payload) => Promise::rejected(reason_from_panic(payload)),
    }
}

fn reason_from_panic(payload: Box<dyn Any + Send>) -> Error {
    let payload = match payload.downcast::<Error>() {
        Ok(err) => return *err,
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<Box<dyn StdError + Send + Sync>>() {
        Ok(err) => return Error::Custom(Arc::from(*err)),
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<Arc<dyn StdError + Send + Sync>>() {
        Ok(err) => return Error::Custom(*err),
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<std::io::Error>() {
        Ok(err) => return Error::new(*err),
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<String>() {
        Ok(message) => return Error::msg(*message),
        Err(payload) => payload,
    };
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return Error::msg(*message);
    }
    let fault = NEXT_FAULT.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(fault, "captured panic with a non-string payload");
    Error::Panicked { fault }
}
