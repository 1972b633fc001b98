//! Awaiting a [`Future`](crate::Future) from async code.
use crate::{Error, Future};
use futures::channel::oneshot::{channel, Receiver};
use std::future::Future as _;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The `std::future::Future` side of a contract, made by
/// [`Future::into_async`] or by `.await`ing a future directly.
///
/// # Examples
///
/// ```
/// use promise_flow::{launch, Error};
/// use futures::executor::block_on;
///
/// let future = launch(|| Ok::<_, Error>(5)).then(|x| Ok(x + 1));
/// assert_eq!(block_on(async { future.await }), Ok(6));
/// ```
#[derive(Debug)]
pub struct Awaiting<T, E = Error> {
    receiver: Receiver<Result<T, E>>,
}

impl<T, E> Future<T, E>
where
    T: Send + 'static,
    E: From<Error> + Send + 'static,
{
    /// Subscribe and hand the result to async code.
    pub fn into_async(self) -> Awaiting<T, E> {
        let (sender, receiver) = channel();
        self.subscribe(move |result| {
            let _ = sender.send(result);
        });
        Awaiting { receiver }
    }
}

impl<T, E> std::future::IntoFuture for Future<T, E>
where
    T: Send + 'static,
    E: From<Error> + Send + 'static,
{
    type Output = Result<T, E>;
    type IntoFuture = Awaiting<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        self.into_async()
    }
}

impl<T, E> std::future::Future for Awaiting<T, E>
where
    E: From<Error>,
{
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(E::from(Error::PromiseDropped))),
            Poll::Pending => Poll::Pending,
        }
    }
}
