//! StudyStage vector crate - chunking, embedding services, and the in-memory
//! similarity index.
//!
//! Text is split into bounded chunks, each chunk is embedded through an
//! [`EmbeddingService`], and the chunk vectors are averaged into one document
//! vector. [`SimilarityIndex`] stores those vectors and ranks them by cosine
//! similarity against an embedded query.

pub mod chunking;
pub mod embedder;
pub mod embedding;
pub mod index;

pub use chunking::{chunk_text, MAX_CHUNK_CHARS};
pub use embedder::{ChunkEmbedder, ChunkError, ChunkOutcome, DocumentEmbedding};
pub use embedding::{DynEmbeddingService, EmbeddingService, MockEmbedding, UpstageEmbedding};
pub use index::{
    cosine_similarity, DocumentSummary, InsertOutcome, Record, SearchHit, SimilarityIndex,
    DEFAULT_TOP_K,
};
