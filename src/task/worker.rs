//! Thread-backed periodic worker.
//!
//! A worker owns one OS thread that calls its step operation in a loop until
//! the run flag is cleared. Cancellation is cooperative: the flag is checked
//! once per iteration and a running step is never interrupted, though steps
//! that wait through [`StepContext::wait`] are woken early by `stop()`.

use super::config::{Pacing, TaskConfig};
use crate::error::{StepError, TaskError, WorkerFailure};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// The unit of work a worker repeats.
pub trait PeriodicStep: Send + 'static {
    fn step(&mut self, ctx: &StepContext) -> Result<(), StepError>;
}

impl<F> PeriodicStep for F
where
    F: FnMut(&StepContext) -> Result<(), StepError> + Send + 'static,
{
    fn step(&mut self, ctx: &StepContext) -> Result<(), StepError> {
        self(ctx)
    }
}

/// Pins a closure to the [`PeriodicStep`] signature so its argument and
/// return types are inferred.
pub fn step_fn<F>(f: F) -> F
where
    F: FnMut(&StepContext) -> Result<(), StepError> + Send + 'static,
{
    f
}

/// Lifecycle of a worker as seen by its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    /// The loop is (or is about to be) executing steps.
    Running,
    /// The loop observed a cleared run flag and returned.
    Exited,
    /// A step failed; the loop terminated and will not be restarted.
    Failed(WorkerFailure),
}

impl WorkerState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerState::Running)
    }
}

/// State shared between a worker's loop, its handle and its manager.
#[derive(Debug)]
pub(crate) struct WorkerShared {
    name: String,
    run: AtomicBool,
    wake_lock: Mutex<()>,
    wake: Condvar,
    state: Mutex<WorkerState>,
    exited: Condvar,
    steps: AtomicU64,
}

impl WorkerShared {
    pub(crate) fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            run: AtomicBool::new(true),
            wake_lock: Mutex::new(()),
            wake: Condvar::new(),
            state: Mutex::new(WorkerState::Running),
            exited: Condvar::new(),
            steps: AtomicU64::new(0),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn should_run(&self) -> bool {
        self.run.load(Ordering::Acquire)
    }

    /// Clears the run flag. Only the first call has any effect.
    pub(crate) fn request_stop(&self) {
        if self.run.swap(false, Ordering::AcqRel) {
            debug!("Stop requested for task: {}", self.name);
            // Taking the lock orders this notify after any waiter's flag check.
            let _guard = self.wake_lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.wake.notify_all();
        }
    }

    pub(crate) fn state(&self) -> WorkerState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn steps(&self) -> u64 {
        self.steps.load(Ordering::Acquire)
    }

    /// Records the terminal state and emits the exit diagnostic.
    pub(crate) fn finish(&self, outcome: Result<(), WorkerFailure>) {
        let next = match outcome {
            Ok(()) => {
                info!("Task exited normally: {}", self.name);
                WorkerState::Exited
            }
            Err(failure) => {
                error!("Task exited with uncaught failure: {}", failure);
                WorkerState::Failed(failure)
            }
        };
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = next;
        self.exited.notify_all();
    }

    /// Waits up to `timeout` for a terminal state. Returns whether one was reached.
    pub(crate) fn wait_exit(&self, timeout: Duration) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (state, _) = self
            .exited
            .wait_timeout_while(state, timeout, |s| !s.is_terminal())
            .unwrap_or_else(PoisonError::into_inner);
        state.is_terminal()
    }

    /// Sleeps up to `duration`, returning early if stop is requested.
    fn wait_real(&self, duration: Duration) -> bool {
        let guard = self.wake_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = self
            .wake
            .wait_timeout_while(guard, duration, |_| self.should_run())
            .unwrap_or_else(PoisonError::into_inner);
        self.should_run()
    }
}

#[derive(Debug, Clone)]
pub(crate) enum WaitClock {
    Real,
    /// Simulated microseconds, advanced instead of sleeping.
    Virtual(Arc<AtomicU64>),
}

/// Handed to every step invocation.
#[derive(Debug, Clone)]
pub struct StepContext {
    shared: Arc<WorkerShared>,
    clock: WaitClock,
}

impl StepContext {
    pub(crate) fn new(shared: Arc<WorkerShared>, clock: WaitClock) -> Self {
        Self { shared, clock }
    }

    pub fn task_name(&self) -> &str {
        self.shared.name()
    }

    /// Whether `stop()` has been requested. Long-running steps should poll this.
    pub fn is_cancelled(&self) -> bool {
        !self.shared.should_run()
    }

    /// Requests that the loop end after the current step.
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// Number of steps completed before this one.
    pub fn iteration(&self) -> u64 {
        self.shared.steps()
    }

    /// Cancellation-aware wait. Returns `false` if the task was stopped
    /// before `duration` elapsed.
    pub fn wait(&self, duration: Duration) -> bool {
        match &self.clock {
            WaitClock::Real => self.shared.wait_real(duration),
            WaitClock::Virtual(micros) => {
                let us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
                micros.fetch_add(us, Ordering::AcqRel);
                self.shared.should_run()
            }
        }
    }
}

/// Runs one step, turning both `Err` returns and panics into a failure.
pub(crate) fn execute_step(
    step: &mut dyn PeriodicStep,
    ctx: &StepContext,
) -> Result<(), WorkerFailure> {
    let shared = &ctx.shared;
    let reason = match panic::catch_unwind(AssertUnwindSafe(|| step.step(ctx))) {
        Ok(Ok(())) => {
            shared.steps.fetch_add(1, Ordering::AcqRel);
            return Ok(());
        }
        Ok(Err(err)) => err.to_string(),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };
    Err(WorkerFailure {
        task: shared.name.clone(),
        reason,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}

fn worker_main(
    shared: &Arc<WorkerShared>,
    mut step: Box<dyn PeriodicStep>,
    pacing: Pacing,
    started: &mpsc::Sender<()>,
) {
    info!("Starting task: {}", shared.name);
    let ctx = StepContext::new(Arc::clone(shared), WaitClock::Real);
    // The creator only waits for this signal, never for the first step.
    let _ = started.send(());

    let mut next_slot = Instant::now();
    let outcome = loop {
        if !shared.should_run() {
            break Ok(());
        }
        if let Err(failure) = execute_step(step.as_mut(), &ctx) {
            break Err(failure);
        }
        if let Pacing::FixedPeriod(period) = pacing {
            let now = Instant::now();
            match next_slot.checked_add(period) {
                Some(slot) if slot > now => {
                    next_slot = slot;
                    ctx.wait(slot - now);
                }
                Some(_) => next_slot = now,
                // Slot is past the clock's range; wait the full period instead.
                None => {
                    next_slot = now;
                    ctx.wait(period);
                }
            }
        }
    };
    shared.finish(outcome);
}

/// Handle to a running thread-backed worker.
///
/// Dropping the handle requests stop and joins the thread. If the step
/// never returns, the drop blocks with it; cancellation is best effort.
#[derive(Debug)]
pub struct PeriodicWorker {
    shared: Arc<WorkerShared>,
    thread: Option<JoinHandle<()>>,
}

impl PeriodicWorker {
    /// Starts the worker thread and returns once it is executing, without
    /// waiting for the first step to finish.
    pub fn spawn(
        step: Box<dyn PeriodicStep>,
        name: &str,
        config: &TaskConfig,
    ) -> Result<Self, TaskError> {
        let shared = WorkerShared::new(name);
        let (started_tx, started_rx) = mpsc::channel();

        let mut builder = thread::Builder::new().name(name.replace('\0', ""));
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let thread_shared = Arc::clone(&shared);
        let pacing = config.pacing;
        let thread = builder
            .spawn(move || worker_main(&thread_shared, step, pacing, &started_tx))
            .map_err(|source| TaskError::ResourceAcquisition {
                name: name.to_owned(),
                source,
            })?;

        if started_rx.recv().is_err() {
            let _ = thread.join();
            return Err(TaskError::StartupAborted(name.to_owned()));
        }

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// Clears the run flag. Idempotent; never re-armed.
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// Liveness of the thread, not of the run flag: may still be `true`
    /// briefly after `stop()`, and is `false` after a failure even though
    /// the flag was never cleared.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn status(&self) -> WorkerState {
        self.shared.state()
    }

    pub fn join_timeout(&self, timeout: Duration) -> bool {
        self.shared.wait_exit(timeout)
    }

    pub fn steps_completed(&self) -> u64 {
        self.shared.steps()
    }

    pub(crate) fn shared(&self) -> &Arc<WorkerShared> {
        &self.shared
    }
}

impl Drop for PeriodicWorker {
    fn drop(&mut self) {
        self.shared.request_stop();
        if let Some(thread) = self.thread.take() {
            // The loop catches step panics, so a join error is not expected.
            if thread.join().is_err() {
                error!("Task thread panicked outside its step: {}", self.shared.name);
            }
        }
    }
}
