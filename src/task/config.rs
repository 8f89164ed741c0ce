use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a worker spaces out its steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pacing {
    /// Run the next step as soon as the previous one returns. Any pacing is
    /// up to the step itself, typically through [`super::StepContext::wait`].
    #[default]
    Unpaced,
    /// Start steps on a fixed period. A step that overruns its slot is
    /// followed immediately by the next one; missed slots are not replayed.
    FixedPeriod(Duration),
}

/// Options applied to every task a manager creates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub pacing: Pacing,
    /// Stack size of the worker thread; platform default when `None`.
    pub stack_size: Option<usize>,
}

impl TaskConfig {
    pub fn with_period(period: Duration) -> Self {
        Self {
            pacing: Pacing::FixedPeriod(period),
            ..Self::default()
        }
    }
}
