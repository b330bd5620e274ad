//! Settle-once promises for threaded code.
//!
//! A [`Promise`] starts pending and is settled exactly once, either fulfilled
//! with a value or rejected with an [`Error`]. Any number of consumers may
//! [`wait`](Promise::wait) on it, `.await` it, or chain continuations with
//! [`then`](Promise::then), [`catch`](Promise::catch),
//! [`then_catch`](Promise::then_catch) and [`finally`](Promise::finally),
//! whether settlement already happened or not. A promise settled with another
//! promise adopts that promise's outcome, at any nesting depth.
//!
//! Groups of promises are combined with [`all`], [`race`], [`any`] and
//! [`all_settled`]. A [`Deferred`] separates the authority to settle from the
//! ability to observe; [`task::spawn`] and [`panic::promisify`] build
//! promises from ordinary closures.
//!
//! Every continuation and combinator branch runs on its own thread (see
//! [`spawn::Config`]). Nothing is ever cancelled.
//!
//! # Examples
//!
//! ```
//! use promise_kit::{Deferred, Resolution, Settle};
//! use futures::executor::block_on;
//! use std::thread;
//!
//! let deferred = Deferred::<String>::new();
//! let greeting = deferred.then(|name| Ok(Resolution::Value(format!("Hi {name}"))));
//! let consumer = thread::spawn(move || block_on(async { greeting.await }));
//! deferred.fulfill("🍓".into());
//! assert_eq!(consumer.join().unwrap().unwrap(), "Hi 🍓");
//! ```
mod combinators;
mod deferred;
mod error;
mod promise;
mod signal;

pub mod panic;
pub mod spawn;
pub mod task;

pub use combinators::{all, all_settled, any, race, Settled};
pub use deferred::Deferred;
pub use error::{AggregateError, Error, PromiseId};
pub use promise::{Promise, Resolution, Resolver, State};

/// The authority to settle a promise.
///
/// Settlement is idempotent: after the first call takes effect, later calls
/// on any handle to the same promise are ignored.
pub trait Settle<T> {
    /// Settles with `resolution`. A promise resolution is adopted without
    /// blocking the caller; adopting the promise being settled, directly or
    /// through a chain, rejects it with [`Error::ChainingCycle`].
    fn resolve(&self, resolution: Resolution<T>);

    fn reject(&self, reason: Error);

    fn fulfill(&self, value: T) {
        self.resolve(Resolution::Value(value))
    }
}
