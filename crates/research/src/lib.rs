//! Research capabilities for PitchScout.
//!
//! Each capability is a small pipeline: fan out to the retrieval and
//! generation oracles at once, then merge what came back with a single
//! structured-extraction call. The agent loop only ever sees them through
//! the capability registry built by [`default_registry`].

pub mod capabilities;
pub mod fanout;
pub mod synth;

#[cfg(test)]
mod test_support;

pub use capabilities::{ResearchClients, default_registry};
pub use fanout::{
    FanOut, FanOutError, FanOutReport, FanoutPartialFailure, Settled, SubQuery, SubResult,
    settle_all,
};
pub use synth::Synthesizer;
