//! Insurance coverage questions answered from policy documents.
//!
//! Policy text is chunked ([`documents`]), embedded into an exact
//! nearest-neighbour index ([`vector`]) and persisted as a snapshot
//! ([`storage`]). Questions are parsed into structured fields ([`query`]) and
//! evaluated against the retrieved chunks by a rule engine ([`decision`]).
//! [`pipeline::CoveragePipeline`] ties the pieces together.

pub mod cli;
pub mod config;
pub mod decision;
pub mod documents;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod query;
pub mod storage;
pub mod vector;

pub use config::Settings;
pub use decision::{Decision, DecisionEngine, DecisionStatus};
pub use documents::{Chunk, SectionChunker};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::CoveragePipeline;
pub use query::{QueryParser, StructuredQuery};
pub use vector::{EmbeddingIndex, SearchHit};
