//! # Robot Controller Hardware Emulation
//!
//! A software model of low-level controller hardware so control code can run
//! and be tested without a physical controller attached.
//!
//! ## Features
//!
//! - **Register models**: alarm and power-rail register banks with the same
//!   accessors as the FPGA interface
//! - **Status frames**: typed, schema-checked, point-in-time snapshots
//! - **Periodic tasks**: background workers with failure containment and a
//!   swappable creation strategy (threads, or a deterministic simulator)
//!
//! ## Quick Start
//!
//! ```rust
//! use rioemu::hardware::{HardwareState, FIELD_ALARM_TRIGGER_TIME};
//!
//! let hw = HardwareState::new();
//! hw.alarm().set_trigger_time(1_000);
//!
//! let frame = hw.capture_frame().unwrap();
//! assert_eq!(frame.get::<u32>(FIELD_ALARM_TRIGGER_TIME).unwrap(), 1_000);
//! ```
//!
//! ## Architecture
//!
//! - [`hardware`] - Register models and the shared hardware context
//! - [`snapshot`] - Status frames, schemas and value kinds
//! - [`task`] - Periodic workers and task managers
//! - [`error`] - Error taxonomy

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod hardware;
pub mod snapshot;
pub mod task;

// Re-export main public types for convenience
pub use error::{SnapshotError, StepError, TaskError, WorkerFailure};
pub use hardware::{Alarm, HardwareState, Power};
pub use snapshot::{HalValue, Schema, SnapshotCell, StatusFrame, ValueKind};
pub use task::{TaskHandle, TaskManager, ThreadTaskManager};
