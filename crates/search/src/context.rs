use crate::coordinator::RetrievalResult;
use std::fmt::Write;

/// Answer the model is told to give when the context does not cover the question
pub const NOT_FOUND_ANSWER: &str = "I cannot find that information in the provided documentation.";

/// System prompt pinning the model to the retrieved context
pub const SYSTEM_INSTRUCTIONS: &str = "You are an expert coding assistant for the JavaScript \
library described by the Context below. Your parametric memory regarding this library is \
unreliable. You MUST rely ONLY on the Context provided to answer the user's question. If the \
Context does not contain the specific function or method requested, you must state: 'I cannot \
find that information in the provided documentation.' DO NOT invent function names.";

/// Render retrieved chunks as numbered snippets tagged with their source
#[must_use]
pub fn render_context(results: &[RetrievalResult<'_>]) -> String {
    let mut out = String::new();
    for (i, result) in results.iter().enumerate() {
        let chunk = result.chunk;
        let _ = write!(out, "--- Snippet {} (Source: {}", i + 1, chunk.source_id());
        if let Some(section) = chunk.kind().section() {
            let _ = write!(out, ", Section: {section}");
        }
        let _ = writeln!(out, ") ---\n{}", chunk.text());
    }
    out
}

/// Chat messages handed to the generation model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessages {
    pub system: String,
    pub user: String,
}

impl PromptMessages {
    #[must_use]
    pub fn new(question: &str, results: &[RetrievalResult<'_>]) -> Self {
        let context = if results.is_empty() {
            "(no relevant snippets found)\n".to_string()
        } else {
            render_context(results)
        };

        Self {
            system: SYSTEM_INSTRUCTIONS.to_string(),
            user: format!("Context:\n{context}\nUser Question: {}\n\nAnswer:", question.trim()),
        }
    }
}
