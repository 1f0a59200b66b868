//! Supervised background workers
//!
//! A [`Supervisor`] runs a task on a dedicated thread. If the task panics it
//! is started again, up to a fixed number of restarts; once that budget is
//! spent the worker is abandoned, an error is logged, and
//! [`Supervisor::status`] reports [`WorkerStatus::Abandoned`].

use parking_lot::{Condvar, Mutex, RwLock};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Lifecycle of a supervised worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    /// The task is running (possibly after restarts)
    Running,
    /// The task returned, normally after a stop request
    Stopped,
    /// The task kept panicking and the restart budget ran out
    Abandoned,
}

/// Stop request shared between a supervisor and its task.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    cond: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop and wake any waiter
    pub fn stop(&self) {
        let mut stopped = self.stopped.lock();
        *stopped = true;
        self.cond.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleep for `timeout` or until a stop is requested.
    ///
    /// Returns `true` if a stop was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.cond.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

#[derive(Debug)]
struct WorkerState {
    status: RwLock<WorkerStatus>,
    restarts: AtomicU32,
}

/// Handle to a supervised worker thread.
///
/// Dropping the handle stops the worker and waits for it to exit.
pub struct Supervisor {
    name: String,
    signal: Arc<StopSignal>,
    state: Arc<WorkerState>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    /// Start `task` on a new thread named `name`.
    ///
    /// The task receives the stop signal and should return once it fires.
    /// A panic restarts the task up to `max_restarts` times.
    pub fn spawn<F>(name: &str, max_restarts: u32, task: F) -> std::io::Result<Self>
    where
        F: Fn(&StopSignal) + Send + 'static,
    {
        let signal = Arc::new(StopSignal::new());
        let state = Arc::new(WorkerState {
            status: RwLock::new(WorkerStatus::Running),
            restarts: AtomicU32::new(0),
        });

        let worker_name = name.to_string();
        let worker_signal = Arc::clone(&signal);
        let worker_state = Arc::clone(&state);

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                run_supervised(&worker_name, max_restarts, &worker_signal, &worker_state, task)
            })?;

        info!("Started background worker {}", name);

        Ok(Self {
            name: name.to_string(),
            signal,
            state,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn status(&self) -> WorkerStatus {
        *self.state.status.read()
    }

    /// Number of restarts performed so far
    pub fn restarts(&self) -> u32 {
        self.state.restarts.load(Ordering::SeqCst)
    }

    /// Signal the worker to stop and wait for its thread to exit
    pub fn stop(&self) {
        self.signal.stop();

        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("name", &self.name)
            .field("status", &self.status())
            .field("restarts", &self.restarts())
            .finish()
    }
}

fn run_supervised<F>(
    name: &str,
    max_restarts: u32,
    signal: &StopSignal,
    state: &WorkerState,
    task: F,
) where
    F: Fn(&StopSignal),
{
    let mut restarts = 0u32;

    loop {
        match panic::catch_unwind(AssertUnwindSafe(|| task(signal))) {
            Ok(()) => {
                *state.status.write() = WorkerStatus::Stopped;
                info!("Background worker {} stopped", name);
                return;
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());

                if signal.is_stopped() {
                    warn!("Panic in {} during shutdown: {}", name, reason);
                    *state.status.write() = WorkerStatus::Stopped;
                    return;
                }

                if restarts >= max_restarts {
                    error!(
                        "Max restarts ({}) reached for {}, giving up after panic: {}",
                        max_restarts, name, reason
                    );
                    *state.status.write() = WorkerStatus::Abandoned;
                    return;
                }

                restarts += 1;
                state.restarts.store(restarts, Ordering::SeqCst);
                warn!(
                    "Panic in {} (restart {}/{}): {}",
                    name, restarts, max_restarts, reason
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn wait_for_status(supervisor: &Supervisor, expected: WorkerStatus) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while supervisor.status() != expected && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(supervisor.status(), expected);
    }

    #[test]
    fn test_stop_signal_wait() {
        let signal = StopSignal::new();
        let start = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));

        signal.stop();
        assert!(signal.wait_timeout(Duration::from_secs(10)));
        assert!(signal.is_stopped());
    }

    #[test]
    fn test_worker_stops_on_request() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);

        let supervisor = Supervisor::spawn("test-ticker", 3, move |signal| {
            while !signal.wait_timeout(Duration::from_millis(5)) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

        thread::sleep(Duration::from_millis(50));
        assert_eq!(supervisor.status(), WorkerStatus::Running);

        supervisor.stop();
        assert_eq!(supervisor.status(), WorkerStatus::Stopped);
        assert!(ticks.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_worker_restarts_after_panic() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let supervisor = Supervisor::spawn("test-flaky", 3, move |signal| {
            let run = counter.fetch_add(1, Ordering::SeqCst);
            if run < 2 {
                panic!("flaky run {}", run);
            }
            signal.wait_timeout(Duration::from_secs(30));
        })
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while runs.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(supervisor.restarts(), 2);
        assert_eq!(supervisor.status(), WorkerStatus::Running);

        supervisor.stop();
        assert_eq!(supervisor.status(), WorkerStatus::Stopped);
    }

    #[test]
    fn test_worker_abandoned_after_budget() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let supervisor = Supervisor::spawn("test-broken", 2, move |_signal| {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("always broken");
        })
        .unwrap();

        wait_for_status(&supervisor, WorkerStatus::Abandoned);

        // First run plus two restarts
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(supervisor.restarts(), 2);
    }

    #[test]
    fn test_zero_restart_budget() {
        let supervisor = Supervisor::spawn("test-once", 0, |_signal| {
            panic!("no second chance");
        })
        .unwrap();

        wait_for_status(&supervisor, WorkerStatus::Abandoned);
        assert_eq!(supervisor.restarts(), 0);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
