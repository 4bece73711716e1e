//! Generative model seam.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// A two-part chat prompt: a system instruction and one human turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system: String,
    pub human: String,
}

/// A hosted model that answers a [`Prompt`] with text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// Model identifier, for logs and health output.
    fn model_name(&self) -> &str;
}
