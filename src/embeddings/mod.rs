// Embeddings module
// Turns a question into the vector the index is searched with

pub mod ollama;

pub use ollama::OllamaClient;

use crate::Result;

/// Anything that can embed a single piece of text.
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
