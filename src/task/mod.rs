//! Periodic background tasks.
//!
//! ```no_run
//! use rioemu::task::{step_fn, TaskManager, ThreadTaskManager};
//! use std::time::Duration;
//!
//! let manager = ThreadTaskManager::new();
//! let handle = manager
//!     .spawn("heartbeat", step_fn(|ctx| {
//!         ctx.wait(Duration::from_millis(20));
//!         Ok(())
//!     }))
//!     .unwrap();
//! handle.stop();
//! assert!(handle.join_timeout(Duration::from_secs(1)));
//! ```

pub mod config;
pub mod manager;
pub mod worker;

pub use config::{Pacing, TaskConfig};
pub use manager::{ShutdownReport, SimulatedTaskManager, TaskHandle, TaskManager, ThreadTaskManager};
pub use worker::{step_fn, PeriodicStep, PeriodicWorker, StepContext, WorkerState};
