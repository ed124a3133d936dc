//! Research: search-augmented synthesis and knowledge capture

mod knowledge;
mod pipeline;

pub use knowledge::{InMemoryKnowledgeStore, KnowledgeStore};
pub use pipeline::ResearchPipeline;
