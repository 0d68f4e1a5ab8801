use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("task `{0}` is already registered")]
    DuplicateTask(String),

    #[error("tasks cannot be registered after start_all")]
    AlreadyStarted,
}

/// Outcome of a cancellable timed wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    TimedOut,
    Cancelled,
}

/// Cancellation handle passed to every supervised task.
///
/// Cancellation is a broadcast: every clone observes it. A dropped
/// supervisor also reads as cancelled, so orphaned tasks wind down
/// instead of running forever.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation has been broadcast.
    pub async fn cancelled(&mut self) {
        while !*self.rx.borrow() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Sleeps for `period` or returns early when cancellation is signalled.
///
/// This is the only point where loop-style tasks observe cancellation, so
/// an in-flight unit of work always finishes before shutdown is noticed.
pub async fn wait_for_period(shutdown: &mut Shutdown, period: Duration) -> WaitOutcome {
    tokio::select! {
        _ = tokio::time::sleep(period) => WaitOutcome::TimedOut,
        _ = shutdown.cancelled() => WaitOutcome::Cancelled,
    }
}

type PanicHandler = Arc<dyn Fn(Box<dyn Any + Send>) + Send + Sync>;
type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type TaskFn = Box<dyn FnOnce(Shutdown) -> TaskFuture + Send>;

struct RegisteredTask {
    name: String,
    run: TaskFn,
}

/// Registry and lifecycle driver for named long-running tasks.
///
/// Tasks are registered up front, started together, and wound down with a
/// single cancellation broadcast plus a bounded wait. A panic inside one
/// task is intercepted and routed to the panic handler; it never takes
/// down the process or the other tasks.
pub struct Supervisor {
    registered: Vec<RegisteredTask>,
    running: Vec<(String, JoinHandle<()>)>,
    cancel: watch::Sender<bool>,
    panic_handler: PanicHandler,
    started: bool,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            registered: Vec::new(),
            running: Vec::new(),
            cancel,
            panic_handler: Arc::new(|_| {}),
            started: false,
        }
    }

    /// Installs the escalation policy invoked with a panicking task's
    /// payload. Defaults to a no-op.
    pub fn with_panic_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Box<dyn Any + Send>) + Send + Sync + 'static,
    {
        self.panic_handler = Arc::new(handler);
        self
    }

    /// Registers a named task. Names are unique; registration closes once
    /// the supervisor has started.
    pub fn register<F, Fut>(&mut self, name: &str, run: F) -> Result<(), SupervisorError>
    where
        F: FnOnce(Shutdown) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.started {
            return Err(SupervisorError::AlreadyStarted);
        }
        if self.registered.iter().any(|t| t.name == name) {
            return Err(SupervisorError::DuplicateTask(name.to_string()));
        }
        self.registered.push(RegisteredTask {
            name: name.to_string(),
            run: Box::new(move |shutdown| Box::pin(run(shutdown))),
        });
        Ok(())
    }

    /// Launches every registered task concurrently, each wrapped so a
    /// panic is caught and handed to the panic handler.
    pub fn start_all(&mut self) {
        self.started = true;
        for task in self.registered.drain(..) {
            let shutdown = Shutdown {
                rx: self.cancel.subscribe(),
            };
            let handler = Arc::clone(&self.panic_handler);
            let name = task.name.clone();
            let future = (task.run)(shutdown);
            let handle = tokio::spawn(async move {
                match AssertUnwindSafe(future).catch_unwind().await {
                    Ok(()) => debug!(task = %name, "task exited"),
                    Err(payload) => {
                        warn!(task = %name, "task panicked");
                        handler(payload);
                    }
                }
            });
            self.running.push((task.name, handle));
        }
    }

    /// Broadcasts cancellation, then waits for every task to exit or for
    /// `timeout`, whichever comes first. Overrunning tasks are abandoned,
    /// not killed; callers needing per-task confirmation must track it
    /// themselves. A second call is a no-op.
    pub async fn stop_all(&mut self, timeout: Duration) {
        let _ = self.cancel.send(true);
        let deadline = Instant::now() + timeout;
        for (name, handle) in self.running.drain(..) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, handle).await {
                Ok(_) => debug!(task = %name, "task stopped"),
                Err(_) => warn!(task = %name, "task did not stop within the shutdown window"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[tokio::test]
    async fn periodic_task_runs_until_stopped() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut supervisor = Supervisor::new();
        {
            let counter = Arc::clone(&counter);
            supervisor
                .register("ticker", move |mut shutdown| async move {
                    loop {
                        match wait_for_period(&mut shutdown, Duration::from_millis(100)).await {
                            WaitOutcome::Cancelled => return,
                            WaitOutcome::TimedOut => {
                                counter.fetch_add(1, Ordering::SeqCst);
                            }
                        }
                    }
                })
                .unwrap();
        }
        supervisor.start_all();
        tokio::time::sleep(Duration::from_millis(350)).await;
        supervisor.stop_all(Duration::from_secs(1)).await;

        let ticks = counter.load(Ordering::SeqCst);
        assert!((3..=4).contains(&ticks), "expected 3 or 4 ticks, got {ticks}");
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let mut supervisor = Supervisor::new();
        supervisor.register("worker", |_| async {}).unwrap();
        let err = supervisor.register("worker", |_| async {}).unwrap_err();
        assert!(matches!(err, SupervisorError::DuplicateTask(name) if name == "worker"));
    }

    #[tokio::test]
    async fn registration_closes_after_start() {
        let mut supervisor = Supervisor::new();
        supervisor.start_all();
        assert!(matches!(
            supervisor.register("late", |_| async {}),
            Err(SupervisorError::AlreadyStarted)
        ));
        supervisor.stop_all(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn panicking_task_reaches_the_handler_once() {
        let payloads: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut supervisor = {
            let payloads = Arc::clone(&payloads);
            Supervisor::new().with_panic_handler(move |payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                payloads.lock().unwrap().push(message);
            })
        };
        supervisor
            .register("faulty", |_| async { panic!("boom") })
            .unwrap();
        supervisor.start_all();

        let start = std::time::Instant::now();
        supervisor.stop_all(Duration::from_secs(1)).await;
        assert!(start.elapsed() < Duration::from_secs(1));

        let payloads = payloads.lock().unwrap();
        assert_eq!(payloads.as_slice(), ["boom"]);
    }

    #[tokio::test]
    async fn panic_in_one_task_leaves_others_running() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut supervisor = Supervisor::new();
        supervisor
            .register("faulty", |_| async { panic!("boom") })
            .unwrap();
        {
            let counter = Arc::clone(&counter);
            supervisor
                .register("steady", move |mut shutdown| async move {
                    loop {
                        match wait_for_period(&mut shutdown, Duration::from_millis(20)).await {
                            WaitOutcome::Cancelled => return,
                            WaitOutcome::TimedOut => {
                                counter.fetch_add(1, Ordering::SeqCst);
                            }
                        }
                    }
                })
                .unwrap();
        }
        supervisor.start_all();
        tokio::time::sleep(Duration::from_millis(120)).await;
        supervisor.stop_all(Duration::from_secs(1)).await;

        assert!(counter.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn stop_all_is_idempotent() {
        let mut supervisor = Supervisor::new();
        supervisor
            .register("worker", |mut shutdown| async move {
                shutdown.cancelled().await;
            })
            .unwrap();
        supervisor.start_all();
        supervisor.stop_all(Duration::from_secs(1)).await;
        supervisor.stop_all(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn overrunning_task_is_abandoned_after_timeout() {
        let mut supervisor = Supervisor::new();
        supervisor
            .register("stubborn", |_| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
            })
            .unwrap();
        supervisor.start_all();

        let start = std::time::Instant::now();
        supervisor.stop_all(Duration::from_millis(50)).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn wait_reports_cancellation_before_the_period_elapses() {
        let (tx, rx) = watch::channel(false);
        let mut shutdown = Shutdown { rx };

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(true);
        });

        let start = std::time::Instant::now();
        let outcome = wait_for_period(&mut shutdown, Duration::from_secs(3)).await;
        assert_eq!(outcome, WaitOutcome::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
