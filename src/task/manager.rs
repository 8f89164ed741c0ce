//! Task creation behind a swappable strategy.
//!
//! Call sites depend only on [`TaskManager`] and [`TaskHandle`]. Production
//! code uses [`ThreadTaskManager`]; tests can drive the same steps
//! deterministically with [`SimulatedTaskManager`].

use super::config::TaskConfig;
use super::worker::{
    execute_step, PeriodicStep, PeriodicWorker, StepContext, WaitClock, WorkerShared,
    WorkerState,
};
use crate::error::TaskError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Owner-side view of a periodic task.
pub trait TaskHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Clears the run flag; checked once per loop iteration. Idempotent.
    fn stop(&self);

    /// Liveness of the underlying execution context. This is deliberately
    /// not the run flag: it can lag behind `stop()` and turns `false` after
    /// a failed step.
    fn is_running(&self) -> bool;

    fn status(&self) -> WorkerState;

    /// Waits up to `timeout` for the task to reach a terminal state.
    fn join_timeout(&self, timeout: Duration) -> bool;

    fn steps_completed(&self) -> u64;
}

/// Capability to create periodic tasks.
pub trait TaskManager: Send + Sync {
    /// Creates a task that calls `step` repeatedly until stopped.
    fn new_blocking_periodic_task(
        &self,
        step: Box<dyn PeriodicStep>,
        name: &str,
    ) -> Result<Box<dyn TaskHandle>, TaskError>;

    fn spawn<S>(&self, name: &str, step: S) -> Result<Box<dyn TaskHandle>, TaskError>
    where
        S: PeriodicStep,
        Self: Sized,
    {
        self.new_blocking_periodic_task(Box::new(step), name)
    }
}

impl TaskHandle for PeriodicWorker {
    fn name(&self) -> &str {
        PeriodicWorker::name(self)
    }

    fn stop(&self) {
        PeriodicWorker::stop(self);
    }

    fn is_running(&self) -> bool {
        PeriodicWorker::is_running(self)
    }

    fn status(&self) -> WorkerState {
        PeriodicWorker::status(self)
    }

    fn join_timeout(&self, timeout: Duration) -> bool {
        PeriodicWorker::join_timeout(self, timeout)
    }

    fn steps_completed(&self) -> u64 {
        PeriodicWorker::steps_completed(self)
    }
}

/// Outcome of [`ThreadTaskManager::shutdown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Tasks that reached a terminal state within the timeout.
    pub exited: Vec<String>,
    /// Tasks still inside a step when the timeout expired.
    pub lingering: Vec<String>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.lingering.is_empty()
    }
}

/// One OS thread per task.
#[derive(Debug, Default)]
pub struct ThreadTaskManager {
    config: TaskConfig,
    live: Mutex<Vec<Weak<WorkerShared>>>,
}

impl ThreadTaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TaskConfig) -> Self {
        Self {
            config,
            live: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    /// Tasks whose handles are still alive and have not terminated.
    pub fn live_tasks(&self) -> usize {
        self.live_workers().len()
    }

    /// Stops every live task and waits, up to `timeout` overall, for each to
    /// terminate. Best effort: a step that never returns stays lingering.
    pub fn shutdown(&self, timeout: Duration) -> ShutdownReport {
        let workers = self.live_workers();
        for worker in &workers {
            worker.request_stop();
        }

        let deadline = Instant::now() + timeout;
        let mut report = ShutdownReport::default();
        for worker in workers {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if worker.wait_exit(remaining) {
                report.exited.push(worker.name().to_owned());
            } else {
                warn!("Task did not stop within shutdown timeout: {}", worker.name());
                report.lingering.push(worker.name().to_owned());
            }
        }
        report
    }

    fn live_workers(&self) -> Vec<Arc<WorkerShared>> {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        live.retain(|w| w.upgrade().is_some_and(|s| !s.state().is_terminal()));
        live.iter().filter_map(Weak::upgrade).collect()
    }
}

impl TaskManager for ThreadTaskManager {
    fn new_blocking_periodic_task(
        &self,
        step: Box<dyn PeriodicStep>,
        name: &str,
    ) -> Result<Box<dyn TaskHandle>, TaskError> {
        let worker = PeriodicWorker::spawn(step, name, &self.config)?;
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        live.retain(|w| w.strong_count() > 0);
        live.push(Arc::downgrade(worker.shared()));
        Ok(Box::new(worker))
    }
}

struct SimulatedTask {
    shared: Arc<WorkerShared>,
    step: Box<dyn PeriodicStep>,
}

#[derive(Debug)]
struct SimulatedHandle {
    shared: Arc<WorkerShared>,
}

impl TaskHandle for SimulatedHandle {
    fn name(&self) -> &str {
        self.shared.name()
    }

    fn stop(&self) {
        self.shared.request_stop();
    }

    fn is_running(&self) -> bool {
        !self.shared.state().is_terminal()
    }

    fn status(&self) -> WorkerState {
        self.shared.state()
    }

    /// Does not advance the simulation; only useful when another thread
    /// is calling [`SimulatedTaskManager::run_round`].
    fn join_timeout(&self, timeout: Duration) -> bool {
        self.shared.wait_exit(timeout)
    }

    fn steps_completed(&self) -> u64 {
        self.shared.steps()
    }
}

/// Releasing the handle stops the task; the next round retires it.
impl Drop for SimulatedHandle {
    fn drop(&mut self) {
        self.shared.request_stop();
    }
}

/// Deterministic single-threaded driver.
///
/// Nothing runs until [`SimulatedTaskManager::run_round`] is called; each
/// round steps every live task once, in creation order, on the calling
/// thread. [`StepContext::wait`] advances a virtual clock instead of
/// sleeping.
#[derive(Default)]
pub struct SimulatedTaskManager {
    tasks: Mutex<Vec<SimulatedTask>>,
    virtual_us: Arc<AtomicU64>,
    rounds: AtomicU64,
}

impl SimulatedTaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one round and returns how many steps were executed.
    ///
    /// Tasks created by a step during the round first run in the next one.
    pub fn run_round(&self) -> usize {
        let batch = std::mem::take(&mut *self.lock_tasks());
        let mut kept = Vec::with_capacity(batch.len());
        let mut executed = 0;

        for mut task in batch {
            if !task.shared.should_run() {
                task.shared.finish(Ok(()));
                continue;
            }
            let ctx = StepContext::new(
                Arc::clone(&task.shared),
                WaitClock::Virtual(Arc::clone(&self.virtual_us)),
            );
            executed += 1;
            match execute_step(task.step.as_mut(), &ctx) {
                Ok(()) => kept.push(task),
                Err(failure) => task.shared.finish(Err(failure)),
            }
        }

        let mut tasks = self.lock_tasks();
        kept.append(&mut tasks);
        *tasks = kept;
        self.rounds.fetch_add(1, Ordering::AcqRel);
        executed
    }

    /// Runs rounds until no task is left or `max_rounds` is reached.
    /// Returns the number of rounds run.
    pub fn run_until_idle(&self, max_rounds: usize) -> usize {
        let mut rounds = 0;
        while rounds < max_rounds && self.live_tasks() > 0 {
            self.run_round();
            rounds += 1;
        }
        rounds
    }

    pub fn live_tasks(&self) -> usize {
        self.lock_tasks().len()
    }

    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::Acquire)
    }

    /// Total time waited by steps through [`StepContext::wait`].
    pub fn virtual_time(&self) -> Duration {
        Duration::from_micros(self.virtual_us.load(Ordering::Acquire))
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<SimulatedTask>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaskManager for SimulatedTaskManager {
    fn new_blocking_periodic_task(
        &self,
        step: Box<dyn PeriodicStep>,
        name: &str,
    ) -> Result<Box<dyn TaskHandle>, TaskError> {
        let shared = WorkerShared::new(name);
        info!("Starting task: {}", name);
        self.lock_tasks().push(SimulatedTask {
            shared: Arc::clone(&shared),
            step,
        });
        Ok(Box::new(SimulatedHandle { shared }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepError;
    use crate::task::step_fn;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_simulated_rounds_are_ordered() {
        let manager = SimulatedTaskManager::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for name in ["a", "b", "c"] {
            let log = Arc::clone(&log);
            manager
                .spawn(
                    name,
                    step_fn(move |ctx| {
                        log.lock().unwrap().push(ctx.task_name().to_owned());
                        Ok(())
                    }),
                )
                .unwrap();
        }

        assert_eq!(manager.run_round(), 3);
        assert_eq!(manager.run_round(), 3);
        assert_eq!(*log.lock().unwrap(), ["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn test_simulated_stop_and_failure() {
        let manager = SimulatedTaskManager::new();
        let stopper = manager
            .spawn(
                "stopper",
                step_fn(|ctx| {
                    if ctx.iteration() == 1 {
                        ctx.stop();
                    }
                    Ok(())
                }),
            )
            .unwrap();
        let failer = manager
            .spawn(
                "failer",
                step_fn(|_ctx| Err(StepError::new("bad register"))),
            )
            .unwrap();

        assert_eq!(manager.run_until_idle(10), 3);
        assert_eq!(stopper.status(), WorkerState::Exited);
        assert_eq!(stopper.steps_completed(), 2);
        assert!(!stopper.is_running());
        assert!(matches!(failer.status(), WorkerState::Failed(ref f) if f.reason == "bad register"));
    }

    #[test]
    fn test_simulated_wait_advances_virtual_clock() {
        let manager = SimulatedTaskManager::new();
        let _handle = manager
            .spawn(
                "ticker",
                step_fn(|ctx| {
                    ctx.wait(Duration::from_millis(20));
                    Ok(())
                }),
            )
            .unwrap();
        for _ in 0..5 {
            manager.run_round();
        }
        assert_eq!(manager.virtual_time(), Duration::from_millis(100));
        assert_eq!(manager.rounds(), 5);
    }

    #[test]
    fn test_dropping_simulated_handle_retires_task() {
        let manager = SimulatedTaskManager::new();
        let steps = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&steps);
        let handle = manager
            .spawn(
                "released",
                step_fn(move |_ctx| {
                    s.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .unwrap();

        manager.run_round();
        assert_eq!(steps.load(Ordering::SeqCst), 1);

        drop(handle);
        assert_eq!(manager.run_until_idle(10), 1);
        assert_eq!(steps.load(Ordering::SeqCst), 1);
        assert_eq!(manager.live_tasks(), 0);
    }

    #[test]
    fn test_thread_manager_shutdown() {
        let manager = ThreadTaskManager::new();
        let steps = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..3)
            .map(|i| {
                let steps = Arc::clone(&steps);
                manager
                    .spawn(
                        &format!("worker-{i}"),
                        step_fn(move |ctx| {
                            steps.fetch_add(1, Ordering::SeqCst);
                            ctx.wait(Duration::from_millis(5));
                            Ok(())
                        }),
                    )
                    .unwrap()
            })
            .collect();

        assert_eq!(manager.live_tasks(), 3);
        let report = manager.shutdown(Duration::from_secs(5));
        assert!(report.is_clean());
        assert_eq!(report.exited.len(), 3);
        assert!(handles.iter().all(|h| h.status() == WorkerState::Exited));
        assert_eq!(manager.live_tasks(), 0);
    }
}
