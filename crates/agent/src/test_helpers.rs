//! Shared test doubles for loop tests.

use crate::oracle::{DecisionContext, DecisionOracle, OracleEvent, OracleStream};
use async_trait::async_trait;
use pitchscout_core::capability::{Capability, Decision};
use pitchscout_core::error::{CapabilityError, ProviderError};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// A decision oracle that plays back scripted turns.
///
/// Every call to `decide` consumes the next turn. With `repeat_last` the
/// final turn is replayed forever; otherwise running out is an error.
/// Every context it receives is kept for inspection.
pub struct ScriptedOracle {
    turns: Mutex<VecDeque<Vec<OracleEvent>>>,
    repeat_last: bool,
    pub contexts: Mutex<Vec<DecisionContext>>,
}

impl ScriptedOracle {
    pub fn new(turns: Vec<Vec<OracleEvent>>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            repeat_last: false,
            contexts: Mutex::new(Vec::new()),
        }
    }

    /// An oracle that answers every turn with `turn`.
    pub fn repeating(turn: Vec<OracleEvent>) -> Self {
        Self {
            turns: Mutex::new(VecDeque::from([turn])),
            repeat_last: true,
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn decide(&self, context: DecisionContext) -> Result<OracleStream, ProviderError> {
        self.contexts.lock().unwrap().push(context);

        let turn = {
            let mut turns = self.turns.lock().unwrap();
            if self.repeat_last && turns.len() == 1 {
                turns.front().cloned()
            } else {
                turns.pop_front()
            }
        };
        let turn = turn.ok_or_else(|| ProviderError::NotConfigured("script exhausted".into()))?;

        let (tx, rx) = mpsc::channel(turn.len().max(1));
        for event in turn {
            let _ = tx.send(Ok(event)).await;
        }
        Ok(rx)
    }
}

/// Shorthand for a decision turn.
pub fn decide(capability: &str, arguments: serde_json::Value) -> Vec<OracleEvent> {
    vec![OracleEvent::Decision(Decision::new(capability, arguments))]
}

/// Shorthand for a final-answer turn with one leading fragment.
pub fn answer(text: &str) -> Vec<OracleEvent> {
    vec![
        OracleEvent::TextFragment(text.into()),
        OracleEvent::FinalAnswer(text.into()),
    ]
}

/// A capability that counts its invocations and returns a fixed value.
pub struct CountingCapability {
    name: &'static str,
    output: serde_json::Value,
    fail: bool,
    pub calls: AtomicUsize,
}

impl CountingCapability {
    pub fn ok(name: &'static str, output: serde_json::Value) -> Self {
        Self {
            name,
            output,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            output: serde_json::Value::Null,
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Capability for CountingCapability {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "test capability"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<serde_json::Value, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CapabilityError::execution(self.name, "upstream unavailable"));
        }
        Ok(self.output.clone())
    }
}

/// Lets a test keep a handle on a capability after registering it.
pub struct Shared(pub std::sync::Arc<CountingCapability>);

#[async_trait]
impl Capability for Shared {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    fn parameters_schema(&self) -> serde_json::Value {
        self.0.parameters_schema()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, CapabilityError> {
        self.0.execute(arguments).await
    }
}
