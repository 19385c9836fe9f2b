//! The decision oracle: given the request and what has happened so far,
//! pick the next capability or give the final answer.
//!
//! The loop only sees the [`DecisionOracle`] trait. [`ProviderOracle`] is
//! the production implementation on top of a tool-calling chat model.

use async_trait::async_trait;
use pitchscout_core::capability::Decision;
use pitchscout_core::error::ProviderError;
use pitchscout_core::message::{Message, MessageToolCall};
use pitchscout_core::provider::{Provider, ProviderRequest, StreamChunk, ToolDefinition};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use crate::run::StepRecord;

/// Built-in system prompt for the research analyst.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a venture research analyst. \
Use the available tools to research the company, its competitors, its founders \
and its finances, one tool call at a time. When you have gathered enough, \
answer the user's request directly. Do not call a tool again with the same \
arguments unless the previous call failed.";

/// Everything the oracle may look at when deciding.
#[derive(Debug, Clone)]
pub struct DecisionContext {
    pub request: String,
    pub capabilities: Vec<ToolDefinition>,
    /// Every step dispatched so far, in order, failures included
    pub history: Vec<StepRecord>,
}

/// One item of an oracle turn. A turn is zero or more `TextFragment`s
/// followed by exactly one `Decision` or `FinalAnswer`.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleEvent {
    TextFragment(String),
    Decision(Decision),
    FinalAnswer(String),
}

pub type OracleStream = mpsc::Receiver<Result<OracleEvent, ProviderError>>;

#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn decide(&self, context: DecisionContext) -> Result<OracleStream, ProviderError>;
}

/// Decision oracle backed by a streaming, tool-calling [`Provider`].
pub struct ProviderOracle {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    system_prompt: String,
}

impl ProviderOracle {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Render the context as a chat transcript.
    fn messages(&self, context: &DecisionContext) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2 + context.history.len() * 2);
        messages.push(Message::system(&self.system_prompt));
        messages.push(Message::user(&context.request));

        for step in &context.history {
            messages.push(Message::assistant_tool_call(MessageToolCall {
                id: step.decision.id.clone(),
                name: step.decision.capability.clone(),
                arguments: step.decision.arguments.to_string(),
            }));
            messages.push(Message::tool_result(
                &step.decision.id,
                step.outcome.render(),
            ));
        }
        messages
    }

    fn request(&self, context: &DecisionContext) -> ProviderRequest {
        let mut request = ProviderRequest::new(&self.model, self.messages(context));
        request.temperature = self.temperature;
        request.tools = context.capabilities.clone();
        request.parallel_tool_calls = false;
        request.stream = true;
        request
    }
}

#[async_trait]
impl DecisionOracle for ProviderOracle {
    async fn decide(&self, context: DecisionContext) -> Result<OracleStream, ProviderError> {
        debug!(
            model = %self.model,
            history = context.history.len(),
            "Requesting decision"
        );
        let chunks = self.provider.stream(self.request(&context)).await?;
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(forward_turn(chunks, tx));
        Ok(rx)
    }
}

/// Translate provider chunks into oracle events until the turn ends.
async fn forward_turn(
    mut chunks: mpsc::Receiver<Result<StreamChunk, ProviderError>>,
    tx: mpsc::Sender<Result<OracleEvent, ProviderError>>,
) {
    let mut text = String::new();

    while let Some(chunk) = chunks.recv().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
        };

        if let Some(content) = chunk.content.filter(|c| !c.is_empty()) {
            text.push_str(&content);
            if tx.send(Ok(OracleEvent::TextFragment(content))).await.is_err() {
                return;
            }
        }

        if chunk.done || !chunk.tool_calls.is_empty() {
            let event = match chunk.tool_calls.into_iter().find(|tc| !tc.name.is_empty()) {
                Some(call) => OracleEvent::Decision(decision_from_call(call)),
                None => OracleEvent::FinalAnswer(text),
            };
            let _ = tx.send(Ok(event)).await;
            return;
        }
    }

    let _ = tx
        .send(Err(ProviderError::StreamInterrupted(
            "stream closed before the final chunk".into(),
        )))
        .await;
}

fn decision_from_call(call: MessageToolCall) -> Decision {
    let arguments = if call.arguments.trim().is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str(&call.arguments).unwrap_or_default()
    };
    let mut decision = Decision::new(call.name, arguments);
    if !call.id.is_empty() {
        decision.id = call.id;
    }
    decision
}
