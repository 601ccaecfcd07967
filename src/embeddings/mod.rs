//! Embedding generation module
//!
//! Builds a normalized text representation of a candidate or job, requests a
//! fixed-length embedding vector from the configured provider and persists it
//! on the owning entity. Vectors are created on first request and only ever
//! regenerated through the explicit re-embed path.

mod client;
mod indexer;
pub mod text;

pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
pub use indexer::EmbedBackfillStats;
pub use indexer::EmbedOutcome;
pub use indexer::EmbeddingIndexer;

/// Default embedding dimension for OpenAI text-embedding-ada-002
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Normalize whitespace before sending text to the embedding API.
///
/// The rendering itself is untruncated by design; only newlines, tabs and
/// repeated spaces are collapsed so the provider sees one clean line.
#[must_use]
pub fn normalize_for_embedding(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}
