//! Futures and promises for dataflow pipelines.
//!
//! A [`contract`] hands out a [`Future`] and a [`Promise`] over one shared
//! state. The promise is fulfilled once; the future is subscribed, polled
//! or waited on once. Whichever side arrives second at the shared state
//! runs the future's callback, inline, without taking a lock.
//!
//! ```
//! use promise_flow::{all, first_of, launch, Error};
//!
//! let answer = launch(|| Ok::<_, Error>(84))
//!     .then(|x| Ok(x / 2))
//!     .recover(|_| Ok(0));
//! assert_eq!(answer.wait(), Ok(42));
//!
//! let race = first_of(vec![launch(|| Ok::<_, Error>(1)), launch(|| Ok(1))]);
//! assert_eq!(race.wait(), Ok(1));
//!
//! let joined = all((1..=4).map(|i| launch(move || Ok::<_, Error>(i))));
//! assert_eq!(joined.wait().map(|v| v.into_iter().sum::<i32>()), Ok(10));
//! ```
//!
//! Errors are data: `then` and `then_async` skip their continuation and
//! forward an upstream error unchanged, `recover` turns it back into a
//! result. Any error type works as long as it converts from [`Error`], which
//! is how dropped promises and panicking computations are reported.

mod awaiting;
mod contract;
mod error;
mod fan_in;
mod launch;
mod pipeline;
mod state;
mod value;

pub use awaiting::Awaiting;
pub use contract::{contract, Future, Polled, Promise};
pub use error::Error;
pub use fan_in::{all, first_of};
pub use launch::{launch, launch_with, Inline, Job, Spawn, ThreadSpawner};
pub use value::Value;
