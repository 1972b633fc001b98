use crate::state::SharedState;
use crate::Error;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Create a matched `Future`/`Promise` pair over one shared state.
///
/// The error type must convert from [`Error`] so that a dropped promise or a
/// panicking computation can be reported through it. [`Error`] itself and
/// `anyhow::Error` qualify; a bare `String` or `std::io::Error` does not and
/// has to be wrapped first, for instance with [`Error::msg`] or a variant of
/// the caller's own error enum.
///
/// # Examples
///
/// ```
/// use promise_flow::{contract, Error};
/// use std::thread;
///
/// let (future, promise) = contract::<String, Error>();
/// let task = thread::spawn(move || promise.keep("Hi".into()));
/// assert_eq!(future.wait(), Ok("Hi".to_string()));
/// task.join().expect("The task thread has panicked.");
/// ```
pub fn contract<T, E>() -> (Future<T, E>, Promise<T, E>)
where
    T: 'static,
    E: From<Error> + 'static,
{
    let state = Arc::new(SharedState::new());
    (
        Future { state: state.clone() },
        Promise { state: Some(state) },
    )
}

/// Write half of a contract. Fulfilled exactly once.
///
/// Every fulfillment takes `self`, so a promise cannot be kept twice:
///
/// ```compile_fail
/// use promise_flow::{contract, Error};
/// let (_future, promise) = contract::<i32, Error>();
/// promise.keep(1);
/// promise.keep(2);
/// ```
///
/// Dropping a promise without fulfilling it fails the future with
/// [`Error::PromiseDropped`].
pub struct Promise<T, E = Error>
where
    T: 'static,
    E: From<Error> + 'static,
{
    state: Option<Arc<SharedState<T, E>>>,
}

/// Read half of a contract.
///
/// A future is consumed by whichever of `subscribe`, `wait` or a ready
/// `poll_ready` is used on it, so it cannot be subscribed twice:
///
/// ```compile_fail
/// use promise_flow::{contract, Error};
/// let (future, _promise) = contract::<i32, Error>();
/// future.subscribe(|_| ());
/// future.subscribe(|_| ());
/// ```
pub struct Future<T, E = Error> {
    state: Arc<SharedState<T, E>>,
}

/// Outcome of a non-blocking look at a future.
pub enum Polled<T, E = Error> {
    /// The result had arrived; the future is used up.
    Ready(Result<T, E>),
    /// Nothing yet; the future is handed back for another try.
    Pending(Future<T, E>),
}

impl<T, E> Promise<T, E>
where
    T: 'static,
    E: From<Error> + 'static,
{
    /// Deposit a value.
    pub fn keep(self, value: T) {
        self.settle(Ok(value))
    }

    /// Deposit a failure.
    pub fn fail(self, error: E) {
        self.settle(Err(error))
    }

    /// Deposit a result as-is.
    pub fn settle(mut self, result: Result<T, E>) {
        self.deliver(result)
    }

    fn deliver(&mut self, result: Result<T, E>) {
        if let Some(state) = self.state.take() {
            // SAFETY: `state` is taken out of the only promise for this
            // contract, so this is the one and only completion.
            unsafe { state.complete(result) }
        }
    }
}

impl<T, E> Drop for Promise<T, E>
where
    T: 'static,
    E: From<Error> + 'static,
{
    fn drop(&mut self) {
        if self.state.is_some() {
            debug!("promise dropped unfulfilled");
            self.deliver(Err(E::from(Error::PromiseDropped)));
        }
    }
}

impl<T, E> Future<T, E>
where
    T: 'static,
    E: From<Error> + 'static,
{
    /// A future that is already resolved with `result`.
    pub fn ready(result: Result<T, E>) -> Self {
        let (future, promise) = contract();
        promise.settle(result);
        future
    }

    pub fn ok(value: T) -> Self {
        Self::ready(Ok(value))
    }

    pub fn err(error: E) -> Self {
        Self::ready(Err(error))
    }

    /// Register the one callback for this future.
    ///
    /// The callback runs exactly once, on whichever thread completes the
    /// pair: the producer's if the result arrives last, this one if the
    /// result is already there.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_flow::{contract, Error};
    /// use std::sync::mpsc::channel;
    ///
    /// let (future, promise) = contract::<i32, Error>();
    /// let (tx, rx) = channel();
    /// future.subscribe(move |result| tx.send(result).unwrap());
    /// promise.keep(4);
    /// assert_eq!(rx.recv().unwrap(), Ok(4));
    /// ```
    pub fn subscribe<F>(self, callback: F)
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        // SAFETY: `self` is consumed, so this is the only subscription and
        // no poll can follow it.
        unsafe { self.state.subscribe(Box::new(callback)) }
    }

    /// Whether the result has arrived. Never blocks.
    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Take the result if it has arrived, otherwise get the future back.
    ///
    /// ```
    /// use promise_flow::{contract, Error, Polled};
    ///
    /// let (future, promise) = contract::<i32, Error>();
    /// let future = match future.poll_ready() {
    ///     Polled::Pending(future) => future,
    ///     Polled::Ready(_) => unreachable!(),
    /// };
    /// promise.keep(1);
    /// assert!(matches!(future.poll_ready(), Polled::Ready(Ok(1))));
    /// ```
    pub fn poll_ready(self) -> Polled<T, E> {
        // SAFETY: a future that polls has not subscribed.
        match unsafe { self.state.take_ready() } {
            Some(result) => Polled::Ready(result),
            None => Polled::Pending(self),
        }
    }

    /// Block until the result arrives.
    ///
    /// This is for terminal consumers; combinators subscribe instead.
    /// Do not wait from inside a callback on a future that the same thread
    /// is completing: callbacks triggered from within a callback run only
    /// after it returns.
    pub fn wait(self) -> Result<T, E> {
        // SAFETY: a future that waits has not subscribed.
        match unsafe { self.state.take_blocking(None) } {
            Some(result) => result,
            None => Err(E::from(Error::PromiseDropped)),
        }
    }

    /// Block for at most `timeout`.
    pub fn wait_timeout(self, timeout: Duration) -> Polled<T, E> {
        // SAFETY: as for `wait`.
        match unsafe { self.state.take_blocking(Some(timeout)) } {
            Some(result) => Polled::Ready(result),
            None => Polled::Pending(self),
        }
    }
}

impl<T, E> Debug for Future<T, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future").field("ready", &self.state.is_ready()).finish()
    }
}

impl<T, E> Debug for Promise<T, E>
where
    T: 'static,
    E: From<Error> + 'static,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").field("fulfilled", &self.state.is_none()).finish()
    }
}

impl<T: Debug, E: Debug> Debug for Polled<T, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Polled::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Polled::Pending(future) => f.debug_tuple("Pending").field(future).finish(),
        }
    }
}
