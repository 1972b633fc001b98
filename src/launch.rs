//! Running computations concurrently and feeding their outcome into a
//! fresh contract.
use crate::{contract, Error, Future};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use tracing::{error, warn};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where launched computations run.
///
/// A spawner that cannot run a job must drop it; the job owns the promise,
/// so the future then fails with [`Error::PromiseDropped`].
pub trait Spawn {
    fn spawn(&self, job: Job);
}

/// Runs every job on a new OS thread.
///
/// ```
/// use promise_flow::{launch_with, Error, ThreadSpawner};
///
/// let spawner = ThreadSpawner::new().name("worker").stack_size(256 * 1024);
/// let future = launch_with(&spawner, || Ok::<_, Error>(std::thread::current().name().map(String::from)));
/// assert_eq!(future.wait(), Ok(Some("worker".to_string())));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ThreadSpawner {
    name: Option<String>,
    stack_size: Option<usize>,
}

/// Runs every job immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl ThreadSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }
}

impl Spawn for ThreadSpawner {
    fn spawn(&self, job: Job) {
        let mut builder = thread::Builder::new();
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        if let Err(e) = builder.spawn(job) {
            error!("failed to spawn computation thread: {e}");
        }
    }
}

impl Spawn for Inline {
    fn spawn(&self, job: Job) {
        job()
    }
}

/// Run `computation` on its own thread and return the future of its result.
///
/// ```
/// use promise_flow::{launch, Error};
///
/// let future = launch(|| Ok::<_, Error>(2 * 2));
/// assert_eq!(future.wait(), Ok(4));
/// ```
pub fn launch<T, E, F>(computation: F) -> Future<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<Error> + Send + 'static,
{
    launch_with(&ThreadSpawner::default(), computation)
}

/// Like [`launch`], on a caller-chosen [`Spawn`].
///
/// A panic inside `computation` fails the future with [`Error::Panicked`].
pub fn launch_with<S, T, E, F>(spawner: &S, computation: F) -> Future<T, E>
where
    S: Spawn + ?Sized,
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<Error> + Send + 'static,
{
    let (future, promise) = contract();
    spawner.spawn(Box::new(move || {
        match panic::catch_unwind(AssertUnwindSafe(computation)) {
            Ok(result) => promise.settle(result),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("launched computation panicked: {message}");
                promise.fail(E::from(Error::Panicked(message)))
            }
        }
    }));
    future
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
