//! Race and join over many futures.
//!
//! Neither combinator cancels the inputs it stops caring about: once a race
//! is won or a join has failed, the remaining results are delivered and
//! dropped unread.
use crate::{contract, Error, Future, Promise};
use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

struct Race<T, E>
where
    T: 'static,
    E: From<Error> + 'static,
{
    promise: Mutex<Option<Promise<T, E>>>,
    arrivals: Receiver<Result<T, E>>,
}

struct Join<T, E>
where
    T: 'static,
    E: From<Error> + 'static,
{
    values: Vec<T>,
    remaining: usize,
    promise: Option<Promise<Vec<T>, E>>,
}

/// Resolve with whichever input completes first, success or failure.
///
/// Every input delivers into a buffer with room for all of them, so a late
/// producer never blocks. An empty input fails with [`Error::NoInputs`].
///
/// ```
/// use promise_flow::{contract, first_of, Error};
///
/// let (slow, _never) = contract::<i32, Error>();
/// let (fast, promise) = contract::<i32, Error>();
/// let race = first_of(vec![slow, fast]);
/// promise.keep(1);
/// assert_eq!(race.wait(), Ok(1));
/// ```
pub fn first_of<T, E, I>(inputs: I) -> Future<T, E>
where
    I: IntoIterator<Item = Future<T, E>>,
    T: Send + 'static,
    E: From<Error> + Send + 'static,
{
    let inputs: Vec<_> = inputs.into_iter().collect();
    let (future, promise) = contract();
    if inputs.is_empty() {
        promise.fail(E::from(Error::NoInputs));
        return future;
    }

    let (tx, rx) = bounded(inputs.len());
    let race = Arc::new(Race {
        promise: Mutex::new(Some(promise)),
        arrivals: rx,
    });
    for input in inputs {
        let tx = tx.clone();
        let race = race.clone();
        input.subscribe(move |result| {
            let _ = tx.try_send(result);
            let winner = race.promise.lock().take();
            if let Some(promise) = winner {
                if let Ok(first) = race.arrivals.try_recv() {
                    trace!("race won");
                    promise.settle(first);
                }
            }
        });
    }
    future
}

/// Resolve with every input's value, in arrival order, or with the first
/// error observed.
///
/// ```
/// use promise_flow::{all, launch, Error};
///
/// let inputs = (1..=3).map(|i| launch(move || Ok::<_, Error>(i)));
/// let mut values = all(inputs).wait().unwrap();
/// values.sort();
/// assert_eq!(values, vec![1, 2, 3]);
/// ```
pub fn all<T, E, I>(inputs: I) -> Future<Vec<T>, E>
where
    I: IntoIterator<Item = Future<T, E>>,
    T: Send + 'static,
    E: From<Error> + Send + 'static,
{
    let inputs: Vec<_> = inputs.into_iter().collect();
    let (future, promise) = contract();
    if inputs.is_empty() {
        promise.keep(Vec::new());
        return future;
    }

    let join = Arc::new(Mutex::new(Join {
        values: Vec::with_capacity(inputs.len()),
        remaining: inputs.len(),
        promise: Some(promise),
    }));
    for input in inputs {
        let join = join.clone();
        input.subscribe(move |result| {
            let outcome = {
                let mut join = join.lock();
                match result {
                    Ok(value) => {
                        if join.promise.is_some() {
                            join.values.push(value);
                            join.remaining -= 1;
                        }
                        if join.remaining == 0 {
                            let values = std::mem::take(&mut join.values);
                            join.promise.take().map(|promise| (promise, Ok(values)))
                        } else {
                            None
                        }
                    }
                    Err(error) => join.promise.take().map(|promise| (promise, Err(error))),
                }
            };
            // Fulfill outside the lock; downstream callbacks run inline.
            if let Some((promise, result)) = outcome {
                trace!(ok = result.is_ok(), "join settled");
                promise.settle(result);
            }
        });
    }
    future
}
