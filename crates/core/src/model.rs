//! Generation and extraction on top of a [`Provider`].
//!
//! `ModelClient` binds a provider to one model name so capabilities can ask
//! for free text or for an object matching a schema without building
//! requests by hand. It is cheap to clone.

use std::sync::Arc;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::debug;
use crate::capability::json_schema_for;
use crate::error::{ProviderError, SynthesisError};
use crate::message::Message;
use crate::provider::{Provider, ProviderRequest, ResponseFormat};

#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Same provider, different model.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, messages: Vec<Message>) -> ProviderRequest {
        let mut request = ProviderRequest::new(&self.model, messages);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request
    }

    /// Free-text completion of a single prompt.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        self.generate_text_with_system(None, prompt).await
    }

    pub async fn generate_text_with_system(
        &self,
        system: Option<&str>,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));

        debug!(model = %self.model, prompt_len = prompt.len(), "Generating text");
        let response = self.provider.complete(self.request(messages)).await?;
        Ok(response.message.content)
    }

    /// Structured extraction: one request constrained to `schema`, parsed as JSON.
    pub async fn generate_object(
        &self,
        prompt: &str,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value, SynthesisError> {
        let mut request = self.request(vec![Message::user(prompt)]);
        request.response_format = Some(ResponseFormat::JsonSchema {
            name: schema_name.to_string(),
            schema,
        });

        debug!(model = %self.model, schema = schema_name, "Extracting object");
        let response = self.provider.complete(request).await?;
        serde_json::from_str(strip_code_fence(&response.message.content)).map_err(|e| {
            SynthesisError::SchemaMismatch {
                schema: schema_name.to_string(),
                reason: format!("output is not JSON: {e}"),
            }
        })
    }

    /// Structured extraction straight into `T`.
    ///
    /// Output that does not deserialize into `T` is a `SchemaMismatch`; a
    /// partially populated `T` is never returned.
    pub async fn generate<T>(&self, prompt: &str) -> Result<T, SynthesisError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let name = T::schema_name();
        let value = self
            .generate_object(prompt, &name, json_schema_for::<T>())
            .await?;
        serde_json::from_value(value).map_err(|e| SynthesisError::SchemaMismatch {
            schema: name,
            reason: e.to_string(),
        })
    }
}

/// Models sometimes wrap JSON in a markdown fence even in JSON mode.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
