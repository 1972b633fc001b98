//! Linear combinators. Each builds a fresh contract, subscribes to the
//! source and completes the new promise from the source's result.
//!
//! An error short-circuits `then` and `then_async`: the continuation is
//! skipped and the error is forwarded unchanged. `recover` is the only
//! stage that looks at errors.
use crate::{contract, Error, Future};

impl<T, E> Future<T, E>
where
    T: Send + 'static,
    E: From<Error> + Send + 'static,
{
    /// Apply `continuation` to the value, on the thread that completes the
    /// source.
    ///
    /// If the source is already resolved, that thread is the caller's and
    /// `continuation` runs before `then` returns, so a panic in it reaches
    /// the caller. Otherwise a panic unwinds the producing thread and the
    /// returned future fails with [`Error::PromiseDropped`].
    ///
    /// ```
    /// use promise_flow::{Error, Future};
    ///
    /// let future = Future::<i32, Error>::ok(21).then(|x| Ok(x * 2));
    /// assert_eq!(future.wait(), Ok(42));
    /// ```
    pub fn then<U, F>(self, continuation: F) -> Future<U, E>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U, E> + Send + 'static,
    {
        let (future, promise) = contract();
        self.subscribe(move |input| match input {
            Ok(value) => promise.settle(continuation(value)),
            Err(error) => promise.fail(error),
        });
        future
    }

    /// Continue with another asynchronous step and flatten its future into
    /// the returned one.
    ///
    /// ```
    /// use promise_flow::{launch, Error, Future};
    ///
    /// let future = Future::<i32, Error>::ok(6)
    ///     .then_async(|x| launch(move || Ok(x * 7)));
    /// assert_eq!(future.wait(), Ok(42));
    /// ```
    pub fn then_async<U, F>(self, continuation: F) -> Future<U, E>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Future<U, E> + Send + 'static,
    {
        let (future, promise) = contract();
        self.subscribe(move |input| match input {
            Ok(value) => continuation(value).subscribe(move |inner| promise.settle(inner)),
            Err(error) => promise.fail(error),
        });
        future
    }

    /// Replace an error with whatever `handler` makes of it. Values pass
    /// through untouched, and later stages run on the new result either way.
    ///
    /// ```
    /// use promise_flow::{Error, Future};
    ///
    /// let future = Future::<i32, Error>::err(Error::msg("handle"))
    ///     .recover(|_| Ok(0))
    ///     .then(|x| Ok(x + 1));
    /// assert_eq!(future.wait(), Ok(1));
    /// ```
    pub fn recover<F>(self, handler: F) -> Future<T, E>
    where
        F: FnOnce(E) -> Result<T, E> + Send + 'static,
    {
        let (future, promise) = contract();
        self.subscribe(move |input| match input {
            Ok(value) => promise.keep(value),
            Err(error) => promise.settle(handler(error)),
        });
        future
    }
}
