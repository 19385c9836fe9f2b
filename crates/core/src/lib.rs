//! # PitchScout Core
//!
//! Domain types, traits, and error definitions for the PitchScout research
//! agent. Every external service (decision, generation, extraction and
//! retrieval oracles) is defined here as a trait; implementations live in
//! `pitchscout-providers`, and tests substitute scripted stubs.

pub mod capability;
pub mod error;
pub mod message;
pub mod model;
pub mod provider;
pub mod search;

// Re-export key types at crate root for ergonomics
pub use capability::{Capability, CapabilityRegistry, Decision, Typed, TypedCapability};
pub use error::{CapabilityError, Error, ProviderError, RegistryError, Result, SearchError, SynthesisError};
pub use message::{Message, MessageToolCall, Role};
pub use model::ModelClient;
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolDefinition};
pub use search::{SearchHit, SearchProvider, SearchQuery};
