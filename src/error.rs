//! Error taxonomy shared by the register, snapshot and task layers.
//!
//! Register models never fail. Everything else funnels into one of the
//! enums below, each local to the smallest unit that can contain it: a
//! single field read, a single `create()` call, or a single worker.

use crate::snapshot::ValueKind;
use thiserror::Error;

/// Failures raised while building, reading or publishing a status frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// A field was written or read under a kind other than its declared one.
    #[error("schema violation on field '{field}': declared {expected}, got {found}")]
    SchemaViolation {
        field: String,
        expected: ValueKind,
        found: ValueKind,
    },

    /// The field is not part of the schema the frame is bound to.
    #[error("field '{0}' is not defined by the schema")]
    UnknownField(String),

    /// A frame was frozen (or read) without a value for a declared field.
    #[error("field '{0}' has no value")]
    MissingField(String),

    /// A frame was published into a cell bound to a different schema.
    #[error("frame schema does not match the publication schema")]
    SchemaMismatch,
}

/// Failures creating a periodic task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The operating system refused to create the execution context.
    #[error("failed to start task '{name}': {source}")]
    ResourceAcquisition {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The execution context died before it reached its first step.
    #[error("task '{0}' terminated before it started")]
    StartupAborted(String),
}

/// Terminal failure of one worker. Recorded, logged, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task '{task}' failed: {reason}")]
pub struct WorkerFailure {
    pub task: String,
    pub reason: String,
}

/// What a step operation returns when it cannot continue.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl StepError {
    pub fn new(msg: impl Into<String>) -> Self {
        StepError::Failed(msg.into())
    }
}
