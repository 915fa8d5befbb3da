//! Inference-backed decisions for Countrydle.
//!
//! | Function | Decides |
//! |----------|---------|
//! | [`classify::enhance`] | whether raw text is a yes/no question about *a* country |
//! | [`answer::answer`] | true / false / unknown for a canonical question |
//! | [`guess::judge`] | whether a guess names the country of the day |
//! | [`retrieve::retrieve`] | the fact fragments shown to the answer oracle |
//!
//! Clients for the external services live beside them: [`OpenAiClient`]
//! (chat completions and embeddings), [`QdrantIndex`] (vector search over
//! REST) and [`MemoryIndex`] for single-process deployments and tests.

pub mod answer;
pub mod classify;
pub mod error;
pub mod fake;
pub mod guess;
pub mod memory;
pub mod openai;
mod prompts;
pub mod qdrant;
pub mod retrieve;

pub use error::{Error, Result};
pub use fake::FakeModel;
pub use memory::MemoryIndex;
pub use openai::{LlmConfig, OpenAiClient};
pub use qdrant::QdrantIndex;
