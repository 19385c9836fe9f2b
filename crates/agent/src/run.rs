//! Run state and the per-step record the loop keeps for every dispatch.

use chrono::{DateTime, Utc};
use pitchscout_core::capability::Decision;
use pitchscout_core::error::CapabilityError;
use serde::{Deserialize, Serialize};

/// Why a dispatched step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownCapability,
    InvalidArguments,
    Execution,
    Synthesis,
}

impl From<&CapabilityError> for FailureKind {
    fn from(err: &CapabilityError) -> Self {
        match err {
            CapabilityError::Unknown(_) => Self::UnknownCapability,
            CapabilityError::InvalidArguments { .. } => Self::InvalidArguments,
            CapabilityError::ExecutionFailed { .. } => Self::Execution,
            CapabilityError::Synthesis(_) => Self::Synthesis,
        }
    }
}

/// What a dispatched capability produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Success { output: serde_json::Value },
    Failure { kind: FailureKind, message: String },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// How the outcome is shown to the decision oracle on the next turn.
    pub fn render(&self) -> String {
        match self {
            Self::Success { output } => match output {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            },
            Self::Failure { message, .. } => format!("Error: {message}"),
        }
    }
}

impl From<Result<serde_json::Value, CapabilityError>> for StepOutcome {
    fn from(result: Result<serde_json::Value, CapabilityError>) -> Self {
        match result {
            Ok(output) => Self::Success { output },
            Err(err) => Self::Failure {
                kind: FailureKind::from(&err),
                message: err.to_string(),
            },
        }
    }
}

/// One dispatched decision and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based position within the run
    pub index: usize,
    pub decision: Decision,
    pub outcome: StepOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RunStatus {
    /// The oracle gave a final answer.
    Completed,
    /// The step ceiling was reached before a final answer.
    BudgetExhausted { ceiling: u32 },
}

/// Mutable state of a single run. Owned by the loop for the run's lifetime.
#[derive(Debug, Clone)]
pub struct RunState {
    pub run_id: String,
    pub request: String,
    pub steps: Vec<StepRecord>,
    /// Every text fragment the oracle emitted, in order
    pub transcript: String,
    pub termination: Option<RunStatus>,
}

impl RunState {
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            request: request.into(),
            steps: Vec::new(),
            transcript: String::new(),
            termination: None,
        }
    }

    /// Number of dispatches so far, failed ones included.
    pub fn step_count(&self) -> u32 {
        self.steps.len() as u32
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }
}

/// Final result of a run handed back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub request: String,
    pub status: RunStatus,
    /// The final answer, or the partial transcript when the budget ran out
    pub answer: String,
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| !s.outcome.is_success()).count()
    }
}
