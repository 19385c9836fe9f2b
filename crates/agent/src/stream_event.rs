//! Agent-level streaming events.
//!
//! The loop reports progress on an `mpsc` channel so a caller can render
//! text as it arrives and show which capability is running.

use crate::run::{RunStatus, StepOutcome};
use serde::{Deserialize, Serialize};

/// Events emitted by the agent during a run.
///
/// - `chunk`       — partial text from the decision oracle
/// - `decision`    — a capability is about to be dispatched
/// - `step_result` — the dispatched capability finished
/// - `done`        — the run terminated
/// - `error`       — the decision oracle failed and the run aborted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Partial text from the oracle.
    Chunk { content: String },

    /// The oracle picked a capability.
    Decision {
        step: usize,
        id: String,
        capability: String,
        arguments: serde_json::Value,
    },

    /// A dispatched capability finished, successfully or not.
    StepResult {
        step: usize,
        id: String,
        capability: String,
        outcome: StepOutcome,
        duration_ms: u64,
    },

    /// The run terminated.
    Done {
        run_id: String,
        status: RunStatus,
        steps: usize,
    },

    /// The run aborted.
    Error { message: String },
}

impl AgentEvent {
    /// Event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::Decision { .. } => "decision",
            Self::StepResult { .. } => "step_result",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}
