//! Transcript intake for the quote engine.
//!
//! Turns a free-text renovation description (call transcript, email, chat)
//! into a [`QuoteRequest`](renoquote_core::QuoteRequest) that the deterministic
//! engine in `renoquote-core` can price.
//!
//! Two readers implement [`TranscriptParser`]:
//! - [`KeywordTranscriptParser`] - local keyword rules, no network access
//! - [`LlmTranscriptParser`] - delegates extraction to an [`LlmClient`] and
//!   falls back to the keyword rules whenever the model response is unusable
//!
//! The model only extracts what the client said. Quantities, materials,
//! prices and VAT are always derived from the reference tables.

pub mod keyword;
pub mod llm;
pub mod transcript;

pub use keyword::KeywordTranscriptParser;
pub use llm::{LlmClient, LlmTranscriptParser};
pub use transcript::{
    ParsedProject, ParserDefaults, ProjectBuilder, TranscriptAnalysis, TranscriptParser,
};
