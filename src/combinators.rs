//! Combinators over groups of promises.
//!
//! Each combinator runs one branch task per input. A branch waits for its
//! input to produce a plain outcome, records it in its own slot, then bumps a
//! shared completion counter. The branch that brings the counter to the input
//! length makes the final decision. Branches are never cancelled: every one
//! of them runs to completion even after the aggregate has settled.
use crate::error::AggregateError;
use crate::promise::{Promise, Resolution, State};
use crate::{spawn, Error};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// The outcome of one input to [`all_settled`].
#[derive(Debug, Clone)]
pub enum Settled<T> {
    Fulfilled(T),
    Rejected(Error),
}

impl<T> Settled<T> {
    pub fn state(&self) -> State {
        match self {
            Settled::Fulfilled(_) => State::Fulfilled,
            Settled::Rejected(_) => State::Rejected,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Settled::Fulfilled(value) => Some(value),
            Settled::Rejected(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&Error> {
        match self {
            Settled::Fulfilled(_) => None,
            Settled::Rejected(reason) => Some(reason),
        }
    }
}

impl<T> From<Result<T, Error>> for Settled<T> {
    fn from(outcome: Result<T, Error>) -> Self {
        match outcome {
            Ok(value) => Settled::Fulfilled(value),
            Err(reason) => Settled::Rejected(reason),
        }
    }
}

/// Per-call branch bookkeeping.
struct Tally<T> {
    slots: Vec<OnceLock<Result<T, Error>>>,
    completed: AtomicUsize,
    first_success: OnceLock<T>,
    first_failure: OnceLock<Error>,
}

impl<T: Clone> Tally<T> {
    fn new(len: usize) -> Arc<Self> {
        Arc::new(Self {
            slots: (0..len).map(|_| OnceLock::new()).collect(),
            completed: AtomicUsize::new(0),
            first_success: OnceLock::new(),
            first_failure: OnceLock::new(),
        })
    }

    /// Records the outcome of branch `index`. Returns `true` for exactly one
    /// caller: the branch that completed last.
    fn record(&self, index: usize, outcome: Result<T, Error>) -> bool {
        match &outcome {
            Ok(value) => {
                self.first_success.get_or_init(|| value.clone());
            }
            Err(reason) => {
                self.first_failure.get_or_init(|| reason.clone());
            }
        }
        let _ = self.slots[index].set(outcome);
        self.completed.fetch_add(1, Ordering::AcqRel) + 1 == self.slots.len()
    }

    fn outcomes(&self) -> impl Iterator<Item = &Result<T, Error>> {
        self.slots.iter().filter_map(OnceLock::get)
    }
}

/// Starts one branch per input; `on_branch` receives each branch's
/// unwrapped outcome on that branch's thread.
fn fan_out<T, F>(inputs: Vec<Resolution<T>>, on_branch: F)
where
    T: Clone + Send + Sync + 'static,
    F: Fn(usize, Result<T, Error>) + Send + Sync + 'static,
{
    let on_branch = Arc::new(on_branch);
    for (index, input) in inputs.into_iter().enumerate() {
        let branch = on_branch.clone();
        if let Err(err) = spawn::spawn("branch", move || branch(index, input.into_result())) {
            on_branch(index, Err(err));
        }
    }
}

/// Fulfills with every value in input order once all inputs have settled.
///
/// If any input rejected, rejects with the first failure observed instead.
/// The decision waits for every input, failures included.
///
/// # Examples
///
/// ```
/// use promise_kit::{all, Promise, Resolution};
/// let values = all(vec![
///     Resolution::Value(1),
///     Resolution::Promise(Promise::fulfilled(2)),
///     Resolution::Value(3),
/// ]);
/// assert_eq!(values.wait().unwrap(), vec![1, 2, 3]);
/// ```
pub fn all<T, I>(inputs: I) -> Promise<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Resolution<T>>,
{
    let inputs: Vec<_> = inputs.into_iter().collect();
    let aggregate = Promise::pending();
    if inputs.is_empty() {
        aggregate.fulfill(Vec::new());
        return aggregate;
    }
    let tally = Tally::new(inputs.len());
    let target = aggregate.clone();
    fan_out(inputs, move |index, outcome| {
        if !tally.record(index, outcome) {
            return;
        }
        match tally.first_failure.get() {
            Some(reason) => {
                target.reject(reason.clone());
            }
            None => {
                let values = tally
                    .outcomes()
                    .filter_map(|outcome| outcome.as_ref().ok().cloned())
                    .collect();
                target.fulfill(values);
            }
        }
    });
    aggregate
}

/// Settles once every input has settled: rejects with the first failure
/// observed if any input rejected, otherwise fulfills with the first value
/// observed.
///
/// Unlike the usual "first settled wins" race, this never settles early and
/// prefers any failure over any success. With no inputs it never settles.
pub fn race<T, I>(inputs: I) -> Promise<T>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Resolution<T>>,
{
    let inputs: Vec<_> = inputs.into_iter().collect();
    let aggregate = Promise::pending();
    let tally = Tally::new(inputs.len());
    let target = aggregate.clone();
    fan_out(inputs, move |index, outcome| {
        if !tally.record(index, outcome) {
            return;
        }
        if let Some(reason) = tally.first_failure.get() {
            target.reject(reason.clone());
        } else if let Some(value) = tally.first_success.get() {
            target.fulfill(value.clone());
        }
    });
    aggregate
}

/// Fulfills with the first value any input produces, without waiting for
/// the others. If every input rejects, rejects with an
/// [`AggregateError`] holding each reason in input order.
pub fn any<T, I>(inputs: I) -> Promise<T>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Resolution<T>>,
{
    let inputs: Vec<_> = inputs.into_iter().collect();
    let aggregate = Promise::pending();
    if inputs.is_empty() {
        aggregate.reject(AggregateError::new(Vec::new()).into());
        return aggregate;
    }
    let tally = Tally::new(inputs.len());
    let target = aggregate.clone();
    fan_out(inputs, move |index, outcome| {
        if let Ok(value) = &outcome {
            target.fulfill(value.clone());
        }
        // Every success settled the aggregate before counting itself, so a
        // pending aggregate here means every branch failed.
        if tally.record(index, outcome) && target.state() == State::Pending {
            let errors = tally
                .outcomes()
                .filter_map(|outcome| outcome.as_ref().err().cloned())
                .collect();
            target.reject(AggregateError::new(errors).into());
        }
    });
    aggregate
}

/// Fulfills, once every input has settled, with one [`Settled`] record per
/// input in input order. Never rejects.
pub fn all_settled<T, I>(inputs: I) -> Promise<Vec<Settled<T>>>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Resolution<T>>,
{
    let inputs: Vec<_> = inputs.into_iter().collect();
    let aggregate = Promise::pending();
    if inputs.is_empty() {
        aggregate.fulfill(Vec::new());
        return aggregate;
    }
    let tally = Tally::new(inputs.len());
    let target = aggregate.clone();
    fan_out(inputs, move |index, outcome| {
        if tally.record(index, outcome) {
            target.fulfill(tally.outcomes().cloned().map(Settled::from).collect());
        }
    });
    aggregate
}
