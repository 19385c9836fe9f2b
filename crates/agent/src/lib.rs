//! The decision loop at the heart of PitchScout.
//!
//! A run follows an **Ask → Dispatch → Observe** cycle:
//!
//! 1. **Ask** the decision oracle for the next move, given the request,
//!    the registered capabilities and every step taken so far
//! 2. **Dispatch** the chosen capability exactly once
//! 3. **Observe**: record the outcome (success or failure) and loop back
//!
//! The loop ends when the oracle gives a final answer or the step ceiling
//! is reached. Text the oracle produces along the way is streamed out as
//! [`AgentEvent::Chunk`] events.

pub mod error;
pub mod loop_runner;
pub mod oracle;
pub mod run;
pub mod stream_event;

#[cfg(test)]
mod test_helpers;

pub use error::AgentError;
pub use loop_runner::{AgentLoop, DEFAULT_MAX_STEPS};
pub use oracle::{
    DEFAULT_SYSTEM_PROMPT, DecisionContext, DecisionOracle, OracleEvent, OracleStream,
    ProviderOracle,
};
pub use run::{FailureKind, RunReport, RunState, RunStatus, StepOutcome, StepRecord};
pub use stream_event::AgentEvent;
