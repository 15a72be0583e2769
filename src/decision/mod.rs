//! Coverage decisions from a structured query and retrieved policy chunks.

pub mod config;
pub mod engine;
pub mod llm;
pub mod rules;
pub mod types;

pub use config::{GenerationConfig, PolicyConfig};
pub use engine::{DecisionEngine, NO_EVIDENCE};
pub use llm::{GenerationError, Generator, HttpGenerator};
pub use types::{Decision, DecisionResponse, DecisionStatus};
