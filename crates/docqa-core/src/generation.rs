//! Generation backend trait.
//!
//! A [`Generator`] performs one round trip to a language model with
//! temperature 0. It never retries on its own: retrying a paid call is a
//! policy decision that belongs to the orchestrator.

use async_trait::async_trait;

use crate::error::Result;

/// Sampling temperature used by every generator.
pub const TEMPERATURE: f32 = 0.0;

#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gemma3"`).
    fn model_name(&self) -> &str;

    /// Complete `prompt` and return the model's text verbatim.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
