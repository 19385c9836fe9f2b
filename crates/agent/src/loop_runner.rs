//! The agent reasoning loop implementation.

use std::sync::Arc;
use std::time::Instant;
use chrono::Utc;
use pitchscout_core::capability::{CapabilityRegistry, Decision};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use crate::error::AgentError;
use crate::oracle::{DecisionContext, DecisionOracle, OracleEvent};
use crate::run::{RunReport, RunState, RunStatus, StepOutcome, StepRecord};
use crate::stream_event::AgentEvent;

/// Default step ceiling.
pub const DEFAULT_MAX_STEPS: u32 = 8;

/// Where the loop is between oracle turns and dispatches.
enum Phase {
    AwaitingDecision,
    Dispatching(Decision),
    Terminated,
}

/// How an oracle turn ended.
enum Turn {
    Decision(Decision),
    FinalAnswer(String),
}

/// Drives one run: ask the oracle, dispatch its decision, feed the outcome
/// back, until it answers or the step ceiling is reached.
pub struct AgentLoop {
    oracle: Arc<dyn DecisionOracle>,

    /// Fixed for the lifetime of the loop
    capabilities: Arc<CapabilityRegistry>,

    /// Maximum dispatches per run
    max_steps: u32,
}

impl AgentLoop {
    pub fn new(oracle: Arc<dyn DecisionOracle>, capabilities: Arc<CapabilityRegistry>) -> Self {
        Self {
            oracle,
            capabilities,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Set the step ceiling.
    pub fn with_max_steps(mut self, max: u32) -> Self {
        self.max_steps = max;
        self
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Run without listening to events.
    pub async fn process(&self, request: &str) -> Result<RunReport, AgentError> {
        let (tx, _) = mpsc::channel(1);
        self.run(request, tx).await
    }

    /// Run a request to termination.
    ///
    /// Capability failures are recorded as failed steps and the run goes on;
    /// only a decision-oracle failure returns `Err`. Events are best-effort:
    /// a dropped receiver does not stop the run.
    pub async fn run(
        &self,
        request: &str,
        events: mpsc::Sender<AgentEvent>,
    ) -> Result<RunReport, AgentError> {
        let mut state = RunState::new(request);
        info!(
            run_id = %state.run_id,
            max_steps = self.max_steps,
            capabilities = self.capabilities.len(),
            "Starting run"
        );

        let mut phase = Phase::AwaitingDecision;
        let answer = loop {
            phase = match phase {
                Phase::AwaitingDecision => {
                    if state.step_count() >= self.max_steps {
                        warn!(
                            run_id = %state.run_id,
                            steps = state.step_count(),
                            "Step ceiling reached, returning partial transcript"
                        );
                        state.termination = Some(RunStatus::BudgetExhausted {
                            ceiling: self.max_steps,
                        });
                        Phase::Terminated
                    } else {
                        match self.next_turn(&mut state, &events).await {
                            Ok(Turn::Decision(decision)) => Phase::Dispatching(decision),
                            Ok(Turn::FinalAnswer(text)) => {
                                state.termination = Some(RunStatus::Completed);
                                break text;
                            }
                            Err(e) => {
                                warn!(run_id = %state.run_id, error = %e, "Decision oracle failed");
                                emit(&events, AgentEvent::Error {
                                    message: e.to_string(),
                                })
                                .await;
                                return Err(e);
                            }
                        }
                    }
                }
                Phase::Dispatching(decision) => {
                    let record = self.dispatch(&state, decision, &events).await;
                    state.steps.push(record);
                    Phase::AwaitingDecision
                }
                Phase::Terminated => break state.transcript.clone(),
            };
        };

        let status = state.termination.unwrap_or(RunStatus::Completed);
        info!(
            run_id = %state.run_id,
            steps = state.step_count(),
            status = ?status,
            "Run finished"
        );
        emit(&events, AgentEvent::Done {
            run_id: state.run_id.clone(),
            status,
            steps: state.steps.len(),
        })
        .await;

        Ok(RunReport {
            run_id: state.run_id,
            request: state.request,
            status,
            answer,
            steps: state.steps,
        })
    }

    /// Ask the oracle once, forwarding text fragments as they arrive.
    async fn next_turn(
        &self,
        state: &mut RunState,
        events: &mpsc::Sender<AgentEvent>,
    ) -> Result<Turn, AgentError> {
        let context = DecisionContext {
            request: state.request.clone(),
            capabilities: self.capabilities.definitions(),
            history: state.steps.clone(),
        };
        debug!(run_id = %state.run_id, step = state.step_count() + 1, "Awaiting decision");

        let mut stream = self.oracle.decide(context).await?;
        while let Some(event) = stream.recv().await {
            match event? {
                OracleEvent::TextFragment(content) => {
                    state.transcript.push_str(&content);
                    emit(events, AgentEvent::Chunk { content }).await;
                }
                OracleEvent::Decision(decision) => return Ok(Turn::Decision(decision)),
                OracleEvent::FinalAnswer(text) => return Ok(Turn::FinalAnswer(text)),
            }
        }
        Err(AgentError::OracleStream)
    }

    /// Invoke the decided capability exactly once and record the outcome.
    async fn dispatch(
        &self,
        state: &RunState,
        decision: Decision,
        events: &mpsc::Sender<AgentEvent>,
    ) -> StepRecord {
        let index = state.steps.len() + 1;
        info!(
            run_id = %state.run_id,
            step = index,
            capability = %decision.capability,
            "Dispatching capability"
        );
        emit(events, AgentEvent::Decision {
            step: index,
            id: decision.id.clone(),
            capability: decision.capability.clone(),
            arguments: decision.arguments.clone(),
        })
        .await;

        let started_at = Utc::now();
        let start = Instant::now();
        let outcome = StepOutcome::from(self.capabilities.execute(&decision).await);
        let duration_ms = start.elapsed().as_millis() as u64;

        if let StepOutcome::Failure { kind, message } = &outcome {
            warn!(
                run_id = %state.run_id,
                step = index,
                capability = %decision.capability,
                kind = ?kind,
                error = %message,
                "Capability failed"
            );
        }

        emit(events, AgentEvent::StepResult {
            step: index,
            id: decision.id.clone(),
            capability: decision.capability.clone(),
            outcome: outcome.clone(),
            duration_ms,
        })
        .await;

        StepRecord {
            index,
            decision,
            outcome,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        }
    }
}

/// Send an event; a closed channel is ignored.
async fn emit(events: &mpsc::Sender<AgentEvent>, event: AgentEvent) {
    let _ = events.send(event).await;
}
