//! Grounded prompt assembly.
//!
//! The template restricts the model to the supplied context, fixes the
//! answer language, and names an exact fallback sentence for questions the
//! context cannot answer. Callers detect "no answer found" with
//! [`PromptTemplate::is_fallback`].

use crate::models::ScoredChunk;

/// Separator between retrieved chunk texts inside the `CONTEXT` field.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

pub const DEFAULT_LANGUAGE: &str = "English";
pub const DEFAULT_FALLBACK: &str = "I could not find the answer in the provided context.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    /// Language every answer must be written in.
    pub language: String,
    /// Sentence the model must reply with, verbatim, when the context
    /// lacks the answer.
    pub fallback: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE, DEFAULT_FALLBACK)
    }
}

impl PromptTemplate {
    pub fn new(language: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            fallback: fallback.into(),
        }
    }

    /// Korean answers with the Korean fallback sentence.
    pub fn korean() -> Self {
        Self::new("Korean", "문맥에서 정보를 찾을 수 없습니다.")
    }

    /// Render the prompt. Chunk texts keep retrieval order; the question is
    /// inserted verbatim.
    pub fn assemble(&self, retrieved: &[ScoredChunk], question: &str) -> String {
        let context = retrieved
            .iter()
            .map(|r| r.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        format!(
            "You are an assistant that answers questions using only the given context.\n\
             Answer factually, accurately and concisely. If the answer cannot be found in the context, reply exactly: \"{fallback}\"\n\
             Write every answer in {language}.\n\
             \n\
             CONTEXT: {context}\n\
             \n\
             QUESTION: {question}\n",
            fallback = self.fallback,
            language = self.language,
            context = context,
            question = question,
        )
    }

    /// Whether `answer` is the fallback sentence (surrounding whitespace ignored).
    pub fn is_fallback(&self, answer: &str) -> bool {
        answer.trim() == self.fallback.trim()
    }
}
