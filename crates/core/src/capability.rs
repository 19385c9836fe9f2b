//! Capability trait — the named, schema-typed actions the agent may invoke.
//!
//! Capabilities are registered once at startup into a [`CapabilityRegistry`]
//! and never change for the lifetime of a run. The registry advertises them
//! to the decision oracle and dispatches the oracle's decisions.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::error::{CapabilityError, RegistryError};
use crate::provider::ToolDefinition;

/// The oracle's request to invoke one capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Call ID (matches the LLM's tool_call.id when there is one)
    pub id: String,

    /// Name of the capability to execute
    pub capability: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

impl Decision {
    pub fn new(capability: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            capability: capability.into(),
            arguments,
        }
    }
}

/// The object-safe capability interface the registry stores.
#[async_trait]
pub trait Capability: Send + Sync {
    /// The unique name of this capability (e.g., "getCompanyInfo").
    fn name(&self) -> &str;

    /// A description of what this capability does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this capability's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the capability with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, CapabilityError>;

    /// Convert this capability into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A capability with a statically typed input and output.
///
/// Wrap it in [`Typed`] to register it; the wrapper derives the parameter
/// schema from `Input` and rejects arguments that do not deserialize.
#[async_trait]
pub trait TypedCapability: Send + Sync + 'static {
    type Input: DeserializeOwned + JsonSchema + Send + 'static;
    type Output: Serialize + Send + 'static;

    const NAME: &'static str;

    fn description(&self) -> &str;

    async fn run(&self, input: Self::Input) -> Result<Self::Output, CapabilityError>;
}

/// Adapter from [`TypedCapability`] to the registry's [`Capability`].
pub struct Typed<C> {
    inner: C,
    schema: serde_json::Value,
}

impl<C: TypedCapability> Typed<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            schema: json_schema_for::<C::Input>(),
        }
    }

    pub fn boxed(inner: C) -> Box<dyn Capability> {
        Box::new(Self::new(inner))
    }
}

#[async_trait]
impl<C: TypedCapability> Capability for Typed<C> {
    fn name(&self) -> &str {
        C::NAME
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn parameters_schema(&self) -> serde_json::Value {
        self.schema.clone()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, CapabilityError> {
        let input: C::Input =
            serde_json::from_value(arguments).map_err(|e| CapabilityError::InvalidArguments {
                capability: C::NAME.to_string(),
                reason: e.to_string(),
            })?;
        let output = self.inner.run(input).await?;
        serde_json::to_value(output).map_err(|e| CapabilityError::execution(C::NAME, e))
    }
}

/// Inline JSON schema for `T`, without the `$schema` meta field.
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let settings = schemars::r#gen::SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let root = settings.into_generator().into_root_schema_for::<T>();
    serde_json::to_value(root).unwrap_or_else(|_| serde_json::json!({ "type": "object" }))
}

/// A registry of available capabilities.
///
/// The agent loop uses this to:
/// 1. Get capability definitions to send to the decision oracle
/// 2. Look up and execute capabilities when the oracle requests them
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Box<dyn Capability>>,
    order: Vec<String>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a capability. A name collision is rejected.
    pub fn register(&mut self, capability: Box<dyn Capability>) -> Result<(), RegistryError> {
        let name = capability.name().to_string();
        if self.capabilities.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.order.push(name.clone());
        self.capabilities.insert(name, capability);
        Ok(())
    }

    /// Get a capability by name.
    pub fn get(&self, name: &str) -> Option<&dyn Capability> {
        self.capabilities.get(name).map(|c| c.as_ref())
    }

    /// All capability definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.capabilities.get(name))
            .map(|c| c.to_definition())
            .collect()
    }

    /// Execute a decision.
    pub async fn execute(&self, decision: &Decision) -> Result<serde_json::Value, CapabilityError> {
        let capability = self
            .get(&decision.capability)
            .ok_or_else(|| CapabilityError::Unknown(decision.capability.clone()))?;
        capability.execute(decision.arguments.clone()).await
    }

    /// List all registered capability names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
