//! The state shared by one `Future`/`Promise` pair.
//!
//! Two events arrive in any order on any thread: the promise depositing a
//! result, and the future registering a callback. Each bumps a counter; the
//! one that brings it to two runs the callback inline. No locks, no waiting.
//!
//! A callback that completes another contract on the same thread does not
//! run the next callback from inside itself: the next one is queued and run
//! by the outermost callback once it returns, so a pipeline of any length
//! completes in constant stack.
use crossbeam_channel::{bounded, Receiver, Sender};
use std::cell::{RefCell, UnsafeCell};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::trace;

pub(crate) type Callback<T, E> = Box<dyn FnOnce(Result<T, E>) + Send + 'static>;

type Deferred = Box<dyn FnOnce()>;

thread_local! {
    // `Some` while this thread is running callbacks.
    static DISPATCH: RefCell<Option<VecDeque<Deferred>>> = RefCell::new(None);
}

/// Run `job` now, or queue it if this thread is already running one.
fn dispatch(job: Deferred) {
    let mut job = Some(job);
    let nested = DISPATCH
        .try_with(|slot| {
            let mut slot = slot.borrow_mut();
            if let Some(queue) = slot.as_mut() {
                queue.extend(job.take());
                return true;
            }
            *slot = Some(VecDeque::new());
            false
        })
        .unwrap_or(false);
    if nested {
        return;
    }

    let _drain = Drain;
    while let Some(current) = job.take() {
        current();
        job = DISPATCH
            .try_with(|slot| slot.borrow_mut().as_mut().and_then(VecDeque::pop_front))
            .ok()
            .flatten();
    }
}

/// Closes the queue when the outermost callback returns or unwinds.
/// Jobs still queued after a panic are dispatched afresh.
struct Drain;

impl Drop for Drain {
    fn drop(&mut self) {
        let rest = DISPATCH.try_with(|slot| slot.borrow_mut().take()).ok().flatten();
        for job in rest.into_iter().flatten() {
            dispatch(job);
        }
    }
}

/// Two-party arrival counter.
#[derive(Debug, Default)]
pub(crate) struct Rendezvous {
    arrivals: AtomicUsize,
}

impl Rendezvous {
    /// Returns `true` for the second party to arrive.
    ///
    /// A third arrival means a handle was used twice and panics.
    pub(crate) fn arrive(&self) -> bool {
        match self.arrivals.fetch_add(1, Ordering::AcqRel) {
            0 => false,
            1 => true,
            n => panic!("rendezvous overrun: arrival #{} on a two-party contract", n + 1),
        }
    }
}

/// Result slot, callback slot, arrival counter and readiness signal of
/// one contract.
///
/// Each cell is written once, by the unique holder of the matching handle:
/// `result` by the promise, `callback` by the future. A cell is read only
/// after that write has been published to the reader, either by the
/// `AcqRel` rendezvous (the second arrival reads both) or by the readiness
/// channel (a polling or waiting future reads `result`). A future that
/// polls or waits never subscribes, so the two read paths never meet.
pub(crate) struct SharedState<T, E> {
    result: UnsafeCell<Option<Result<T, E>>>,
    callback: UnsafeCell<Option<Callback<T, E>>>,
    rendezvous: Rendezvous,
    ready_tx: Sender<()>,
    ready_rx: Receiver<()>,
}

unsafe impl<T: Send, E: Send> Send for SharedState<T, E> {}
unsafe impl<T: Send, E: Send> Sync for SharedState<T, E> {}

impl<T, E> SharedState<T, E> {
    pub(crate) fn new() -> Self {
        let (ready_tx, ready_rx) = bounded(1);
        Self {
            result: UnsafeCell::new(None),
            callback: UnsafeCell::new(None),
            rendezvous: Rendezvous::default(),
            ready_tx,
            ready_rx,
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        !self.ready_rx.is_empty()
    }

    /// Take the result if the readiness signal has fired.
    ///
    /// # Safety
    ///
    /// Only for a future that never subscribes.
    pub(crate) unsafe fn take_ready(&self) -> Option<Result<T, E>> {
        match self.ready_rx.try_recv() {
            Ok(()) => (*self.result.get()).take(),
            Err(_) => None,
        }
    }

    /// Block until the readiness signal fires, then take the result.
    ///
    /// # Safety
    ///
    /// Same as [`take_ready`](Self::take_ready).
    pub(crate) unsafe fn take_blocking(&self, timeout: Option<Duration>) -> Option<Result<T, E>> {
        let signal = match timeout {
            Some(timeout) => self.ready_rx.recv_timeout(timeout).is_ok(),
            None => self.ready_rx.recv().is_ok(),
        };
        if signal {
            (*self.result.get()).take()
        } else {
            None
        }
    }
}

impl<T: 'static, E: 'static> SharedState<T, E> {
    /// Store the result, raise the readiness signal and arrive.
    ///
    /// # Safety
    ///
    /// Must be called at most once, by the promise side.
    pub(crate) unsafe fn complete(&self, result: Result<T, E>) {
        // SAFETY: no reader exists yet. The readiness signal is raised and
        // the rendezvous bumped only after this write, and every read of
        // `result` waits for one of the two.
        *self.result.get() = Some(result);
        let _ = self.ready_tx.try_send(());
        self.arrive();
    }

    /// Store the callback and arrive.
    ///
    /// # Safety
    ///
    /// Must be called at most once, by the future side, and never after
    /// [`take_ready`](Self::take_ready) has been used on the same state.
    pub(crate) unsafe fn subscribe(&self, callback: Callback<T, E>) {
        *self.callback.get() = Some(callback);
        self.arrive();
    }

    fn arrive(&self) {
        if !self.rendezvous.arrive() {
            return;
        }
        trace!("rendezvous complete, firing callback");
        // SAFETY: both parties have arrived, so both cells are written and
        // no one else touches them again.
        let (callback, result) = unsafe { ((*self.callback.get()).take(), (*self.result.get()).take()) };
        match (callback, result) {
            (Some(callback), Some(result)) => dispatch(Box::new(move || callback(result))),
            _ => unreachable!("rendezvous completed without a result and a callback"),
        }
    }
}
