use promise_flow::{all, contract, first_of, launch, Error, Future};
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, Ordering};
use std::sync::mpsc::channel;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, registry};

fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    filter = filter.add_directive(LevelFilter::WARN.into());
    let print = fmt::layer().compact().with_test_writer();
    let _ = registry().with(filter).with(print).try_init();
}

/// Futures that each sleep a distinct multiple of 5ms, in shuffled order,
/// then return the post-increment value of a shared counter.
fn counting_waiters(n: i32) -> Vec<Future<i32, Error>> {
    let index = Arc::new(AtomicI32::new(0));
    let mut delays: Vec<u64> = (0..n as u64).map(|i| i * 5).collect();
    delays.shuffle(&mut thread_rng());
    delays
        .into_iter()
        .map(|ms| {
            let index = index.clone();
            launch(move || {
                thread::sleep(Duration::from_millis(ms));
                Ok(index.fetch_add(1, Ordering::SeqCst) + 1)
            })
        })
        .collect()
}

#[test]
fn test_subscribe_fires_after_arrival() {
    init_logging();
    let counter = Arc::new(AtomicI64::new(7));
    let (gate_tx, gate_rx) = channel::<()>();
    let (done_tx, done_rx) = channel();

    let future = launch(move || -> Result<i64, Error> {
        gate_rx.recv().map_err(|e| Error::msg(e.to_string()))?;
        Ok(2 * 2)
    });
    let seen = counter.clone();
    future.subscribe(move |result| {
        let value = result.expect("computation failed");
        seen.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |a| Some(a * value))
            .expect("update failed");
        done_tx.send(value).expect("receiver gone");
    });

    assert_eq!(counter.load(Ordering::SeqCst), 7);
    gate_tx.send(()).expect("computation gone");
    assert_eq!(done_rx.recv().expect("callback never fired"), 4);
    assert_eq!(counter.load(Ordering::SeqCst), 28);
}

#[test]
fn test_then_short_circuits() {
    init_logging();
    let reached = Arc::new(AtomicBool::new(false));
    let flag = reached.clone();
    let future = launch(|| Ok::<_, Error>(rand::random::<u16>() as i64))
        .then(|x| Ok((x / 7).to_string()))
        .then(|_| Err::<i32, _>(Error::msg("skip")))
        .then(move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
    let error = future.wait().unwrap_err();
    assert_eq!(error.to_string(), "skip");
    assert!(!reached.load(Ordering::SeqCst));
}

#[test]
fn test_then_short_circuits_with_anyhow() {
    init_logging();
    let future = launch(|| Ok::<_, anyhow::Error>(70))
        .then(|x| Ok(x / 7))
        .then(|_| Err::<i32, _>(anyhow::anyhow!("skip")))
        .then(|_| -> anyhow::Result<()> { panic!("Don't execute then if result fails") });
    assert_eq!(future.wait().unwrap_err().to_string(), "skip");
}

#[test]
fn test_then_async() {
    init_logging();
    let make_request = |_: String| {
        launch(|| {
            thread::sleep(Duration::from_millis(50));
            Ok::<_, Error>(42)
        })
    };
    let future = launch(|| Ok::<_, Error>(rand::random::<u16>()))
        .then(|x| Ok((x / 7).to_string()))
        .then_async(make_request)
        .then(|x| Ok(x == 42));
    assert_eq!(future.wait(), Ok(true));
}

#[test]
fn test_recover_continues_pipeline() {
    init_logging();
    let after = Arc::new(AtomicBool::new(false));
    let flag = after.clone();
    let future = launch(|| Ok::<_, Error>(rand::random::<u16>()))
        .then(|x| Ok((x / 7).to_string()))
        .then(|_| Err::<Option<i32>, _>(Error::msg("handle")))
        .recover(|e| {
            assert_eq!(e.to_string(), "handle");
            Ok(None)
        })
        .then(move |recovered| {
            flag.store(true, Ordering::SeqCst);
            Ok(recovered.unwrap_or(-1))
        });
    assert_eq!(future.wait(), Ok(-1));
    assert!(after.load(Ordering::SeqCst));
}

#[test]
fn test_first_of() {
    init_logging();
    let race = first_of(counting_waiters(100));
    assert_eq!(race.wait(), Ok(1));
}

#[test]
fn test_all() {
    init_logging();
    let joined = all(counting_waiters(100));
    let values = joined.wait().expect("join failed");
    assert_eq!(values.len(), 100);
    assert_eq!(values.iter().sum::<i32>(), 5050);
}

#[test]
fn test_all_fail_fast() {
    init_logging();
    let inputs: Vec<Future<i32, Error>> = (0..10)
        .map(|i| {
            launch(move || {
                if i == 3 {
                    Err(Error::msg("input 3 failed"))
                } else {
                    thread::sleep(Duration::from_millis(20));
                    Ok(i)
                }
            })
        })
        .collect();
    assert_eq!(all(inputs).wait(), Err(Error::msg("input 3 failed")));
}

#[test]
fn test_callback_fires_once_under_contention() {
    init_logging();
    for round in 0..200 {
        let (future, promise) = contract::<i32, Error>();
        let (tx, rx) = channel();
        let barrier = Arc::new(Barrier::new(2));

        let b = barrier.clone();
        let producer = thread::spawn(move || {
            b.wait();
            promise.keep(round);
        });
        let b = barrier.clone();
        let consumer = thread::spawn(move || {
            b.wait();
            future.subscribe(move |result| tx.send(result).expect("receiver gone"));
        });
        producer.join().expect("The producer thread has panicked");
        consumer.join().expect("The consumer thread has panicked");

        assert_eq!(rx.recv(), Ok(Ok(round)));
        assert!(rx.try_recv().is_err());
    }
}

#[test]
fn test_launch_panic_reaches_pipeline_end() {
    init_logging();
    let future = launch(|| -> Result<i32, Error> { panic!("lost") })
        .then(|x| Ok(x + 1))
        .recover(|e| match e {
            Error::Panicked(message) => Ok(message.len() as i32),
            other => Err(other),
        });
    assert_eq!(future.wait(), Ok(4));
}

#[test]
fn test_panicking_continuation_drops_promise() {
    init_logging();
    let (gate_tx, gate_rx) = channel::<()>();
    let reached = Arc::new(AtomicBool::new(false));
    let flag = reached.clone();
    let future = launch(move || -> Result<i32, Error> {
        gate_rx.recv().map_err(|e| Error::msg(e.to_string()))?;
        Ok(1)
    })
    .then(|_| -> Result<i32, Error> { panic!("continuation failed") })
    .then(move |x| {
        flag.store(true, Ordering::SeqCst);
        Ok(x + 1)
    });
    gate_tx.send(()).expect("computation gone");
    assert_eq!(future.wait(), Err(Error::PromiseDropped));
    assert!(!reached.load(Ordering::SeqCst));
}
