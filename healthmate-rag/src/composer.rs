//! Answer composition: retrieved chunks + question → prompt → model → cited answer.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::chat::{ChatModel, Prompt};
use crate::document::{Citation, SearchResult};
use crate::error::Result;

/// System instruction used unless a persona is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers using the provided context. If uncertain, say you don't know.";

/// Upper bound on the joined context, in characters.
pub const MAX_CONTEXT_CHARS: usize = 12_000;

const CHUNK_SEPARATOR: &str = "\n\n";

/// A generated answer and the chunks it was grounded on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub answer: String,
    /// One entry per retrieved chunk, in retrieval order.
    pub sources: Vec<Citation>,
}

/// Builds the prompt from retrieved chunks and asks a [`ChatModel`].
#[derive(Clone)]
pub struct AnswerComposer {
    model: Arc<dyn ChatModel>,
    system_prompt: String,
    max_context_chars: usize,
}

impl std::fmt::Debug for AnswerComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerComposer")
            .field("model", &self.model.model_name())
            .field("max_context_chars", &self.max_context_chars)
            .finish_non_exhaustive()
    }
}

impl AnswerComposer {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_context_chars: MAX_CONTEXT_CHARS,
        }
    }

    /// Replace the system instruction (persona).
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_context_chars(mut self, max: usize) -> Self {
        self.max_context_chars = max;
        self
    }

    /// Join chunk texts, keeping whole chunks while they fit and cutting the
    /// first one that crosses the limit. Later chunks are dropped.
    pub fn build_context(&self, results: &[SearchResult]) -> String {
        let mut context = String::new();
        let mut used = 0usize;

        for (i, result) in results.iter().enumerate() {
            let separator = if i == 0 { "" } else { CHUNK_SEPARATOR };
            let piece_len = separator.chars().count() + result.chunk.text.chars().count();

            if used + piece_len <= self.max_context_chars {
                context.push_str(separator);
                context.push_str(&result.chunk.text);
                used += piece_len;
                continue;
            }

            let room = self.max_context_chars - used;
            context.extend(separator.chars().chain(result.chunk.text.chars()).take(room));
            break;
        }

        context
    }

    pub fn build_prompt(&self, question: &str, results: &[SearchResult]) -> Prompt {
        let context = self.build_context(results);
        Prompt {
            system: self.system_prompt.clone(),
            human: format!("Context:\n{context}\n\nQuestion: {question}"),
        }
    }

    /// Ask the model. It is invoked even when `results` is empty.
    pub async fn answer(&self, question: &str, results: &[SearchResult]) -> Result<Answer> {
        let prompt = self.build_prompt(question, results);
        debug!(
            model = self.model.model_name(),
            chunks = results.len(),
            prompt_chars = prompt.human.chars().count(),
            "invoking model"
        );

        let answer = self.model.generate(&prompt).await?;
        let sources = results.iter().map(SearchResult::citation).collect();
        info!(model = self.model.model_name(), chunks = results.len(), "answer composed");

        Ok(Answer { answer, sources })
    }
}
