/// Tests for ReadbackScheduler

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

#[derive(Clone, Copy)]
enum Outcome {
    Complete(u32),
    Timeout,
    WaitError,
    ReadError,
}

struct FakeJob {
    outcome: Outcome,
    released: Arc<AtomicUsize>,
    waited_with: Arc<Mutex<Option<Duration>>>,
}

impl ReadbackJob for FakeJob {
    type Output = u32;

    fn wait(&mut self, timeout: Duration) -> Result<bool> {
        *self.waited_with.lock().unwrap() = Some(timeout);
        match self.outcome {
            Outcome::Timeout => Ok(false),
            Outcome::WaitError => Err(Error::BackendError("device lost".to_string())),
            _ => Ok(true),
        }
    }

    fn read(&mut self) -> Result<u32> {
        match self.outcome {
            Outcome::Complete(value) => Ok(value),
            _ => Err(Error::BackendError("map failed".to_string())),
        }
    }

    fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

fn run(outcome: Outcome) -> (Option<u32>, usize, Option<Duration>) {
    let config = Config {
        readback_timeout: Duration::from_millis(250),
        ..Config::default()
    };
    let scheduler = ReadbackScheduler::new(&config).unwrap();
    let released = Arc::new(AtomicUsize::new(0));
    let waited_with = Arc::new(Mutex::new(None));
    let (tx, rx) = mpsc::channel();

    scheduler.submit(
        FakeJob { outcome, released: released.clone(), waited_with: waited_with.clone() },
        move |value| {
            tx.send(value).unwrap();
        },
    );
    let value = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(scheduler.wait_for_pending(Duration::from_secs(5)));
    let timeout = *waited_with.lock().unwrap();
    (value, released.load(Ordering::SeqCst), timeout)
}

#[test]
fn test_completed_readback_delivers_value() {
    let (value, released, timeout) = run(Outcome::Complete(42));
    assert_eq!(value, Some(42));
    assert_eq!(released, 1);
    assert_eq!(timeout, Some(Duration::from_millis(250)));
}

#[test]
fn test_timeout_delivers_none_and_releases() {
    let (value, released, _) = run(Outcome::Timeout);
    assert_eq!(value, None);
    assert_eq!(released, 1);
}

#[test]
fn test_failures_deliver_none_and_release() {
    let (value, released, _) = run(Outcome::WaitError);
    assert_eq!(value, None);
    assert_eq!(released, 1);

    let (value, released, _) = run(Outcome::ReadError);
    assert_eq!(value, None);
    assert_eq!(released, 1);
}

#[test]
fn test_release_happens_before_callback() {
    let scheduler = ReadbackScheduler::new(&Config::default()).unwrap();
    let released = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();

    let observed = released.clone();
    scheduler.submit(
        FakeJob {
            outcome: Outcome::Complete(1),
            released: released.clone(),
            waited_with: Arc::new(Mutex::new(None)),
        },
        move |_| {
            tx.send(observed.load(Ordering::SeqCst)).unwrap();
        },
    );
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
}

#[test]
fn test_wait_for_pending_drains_many_jobs() {
    let scheduler = ReadbackScheduler::new(&Config::default()).unwrap();
    let released = Arc::new(AtomicUsize::new(0));
    let delivered = Arc::new(AtomicUsize::new(0));

    for i in 0..16 {
        let delivered = delivered.clone();
        scheduler.submit(
            FakeJob {
                outcome: Outcome::Complete(i),
                released: released.clone(),
                waited_with: Arc::new(Mutex::new(None)),
            },
            move |value| {
                if value.is_some() {
                    delivered.fetch_add(1, Ordering::SeqCst);
                }
            },
        );
    }

    assert!(scheduler.wait_for_pending(Duration::from_secs(5)));
    assert_eq!(scheduler.pending_count(), 0);
    assert_eq!(released.load(Ordering::SeqCst), 16);
    assert_eq!(delivered.load(Ordering::SeqCst), 16);
}

#[test]
fn test_wait_for_pending_times_out() {
    let scheduler = ReadbackScheduler::new(&Config::default()).unwrap();
    let (gate_tx, gate_rx) = mpsc::channel::<()>();

    struct BlockedJob(mpsc::Receiver<()>);
    impl ReadbackJob for BlockedJob {
        type Output = ();
        fn wait(&mut self, _timeout: Duration) -> Result<bool> {
            Ok(self.0.recv().is_ok())
        }
        fn read(&mut self) -> Result<()> {
            Ok(())
        }
        fn release(&mut self) {}
    }

    scheduler.submit(BlockedJob(gate_rx), |_| {});
    assert!(!scheduler.wait_for_pending(Duration::from_millis(20)));
    assert_eq!(scheduler.pending_count(), 1);

    gate_tx.send(()).unwrap();
    assert!(scheduler.wait_for_pending(Duration::from_secs(5)));
}
