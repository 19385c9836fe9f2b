//! Synthesizer: one structured-extraction call that merges a bag of raw
//! results into a typed object.

use pitchscout_core::error::SynthesisError;
use pitchscout_core::model::ModelClient;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

#[derive(Clone)]
pub struct Synthesizer {
    model: ModelClient,
}

impl Synthesizer {
    pub fn new(model: ModelClient) -> Self {
        Self { model }
    }

    /// Merge `raw` into a `T`.
    ///
    /// Exactly one extraction request is made, carrying the serialized bag
    /// and the JSON schema of `T`. Anything that does not deserialize into
    /// `T` is a [`SynthesisError::SchemaMismatch`].
    pub async fn merge<T, R>(&self, instructions: &str, raw: &R) -> Result<T, SynthesisError>
    where
        T: DeserializeOwned + JsonSchema,
        R: Serialize + ?Sized,
    {
        let sources = serde_json::to_string(raw).map_err(|e| SynthesisError::SchemaMismatch {
            schema: T::schema_name(),
            reason: format!("raw results are not serializable: {e}"),
        })?;
        debug!(
            model = %self.model.model(),
            schema = %T::schema_name(),
            bytes = sources.len(),
            "Synthesizing"
        );
        let prompt = format!("{instructions}\nSynthesize from the following sources:\n{sources}");
        self.model.generate::<T>(&prompt).await
    }
}
