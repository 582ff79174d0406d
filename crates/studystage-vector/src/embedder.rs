//! Chunk-and-average document embedding.
//!
//! `ChunkEmbedder` splits text into bounded chunks, embeds each chunk through
//! an [`EmbeddingService`], and averages the successful chunk vectors into a
//! single document vector. Per-chunk failures are recorded as explicit
//! [`ChunkOutcome`] values and folded afterwards; only a document where every
//! chunk failed is an error.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use studystage_core::config::RetrievalConfig;
use studystage_core::error::{Result, StudyError};

use crate::chunking::{chunk_text, MAX_CHUNK_CHARS};
use crate::embedding::{DynEmbeddingService, EmbeddingService};

/// Why a single chunk produced no usable vector.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("embedding request failed: {0}")]
    Service(#[from] StudyError),

    /// Vector length disagrees with the first successful chunk of the document.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("service returned an empty vector")]
    EmptyVector,

    #[error("service returned a non-finite value")]
    NonFinite,
}

/// Result of embedding one chunk.
#[derive(Debug)]
pub enum ChunkOutcome {
    Embedded(Vec<f32>),
    Failed(ChunkError),
}

impl ChunkOutcome {
    pub fn is_embedded(&self) -> bool {
        matches!(self, ChunkOutcome::Embedded(_))
    }
}

/// A document-level vector plus the chunk accounting behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentEmbedding {
    pub vector: Vec<f32>,
    /// Number of chunks the text was split into.
    pub chunks: usize,
    /// Chunks skipped because their embedding failed.
    pub failed_chunks: usize,
}

impl DocumentEmbedding {
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }
}

/// Turn raw per-chunk service results into outcomes, in chunk order.
///
/// The first non-empty, all-finite vector fixes the dimensionality for the
/// document; any later vector of a different length becomes a
/// [`ChunkError::Dimension`] failure rather than being truncated or padded.
/// Vectors holding NaN or infinity are failures and never fix the length.
pub fn classify(results: Vec<Result<Vec<f32>>>) -> Vec<ChunkOutcome> {
    let mut dimensions: Option<usize> = None;

    results
        .into_iter()
        .map(|result| match result {
            Err(e) => ChunkOutcome::Failed(ChunkError::Service(e)),
            Ok(vector) if vector.is_empty() => ChunkOutcome::Failed(ChunkError::EmptyVector),
            Ok(vector) if vector.iter().any(|x| !x.is_finite()) => {
                ChunkOutcome::Failed(ChunkError::NonFinite)
            }
            Ok(vector) => match dimensions {
                None => {
                    dimensions = Some(vector.len());
                    ChunkOutcome::Embedded(vector)
                }
                Some(expected) if expected == vector.len() => ChunkOutcome::Embedded(vector),
                Some(expected) => ChunkOutcome::Failed(ChunkError::Dimension {
                    expected,
                    actual: vector.len(),
                }),
            },
        })
        .collect()
}

/// Fold chunk outcomes into the element-wise mean of the embedded vectors.
///
/// Assumes the embedded vectors share one length, which [`classify`]
/// guarantees. Fails with `EmbeddingUnavailable` when nothing was embedded.
pub fn aggregate(outcomes: &[ChunkOutcome]) -> Result<DocumentEmbedding> {
    let mut sum: Vec<f64> = Vec::new();
    let mut embedded = 0usize;

    for vector in outcomes.iter().filter_map(|o| match o {
        ChunkOutcome::Embedded(v) => Some(v),
        ChunkOutcome::Failed(_) => None,
    }) {
        if sum.is_empty() {
            sum = vec![0.0; vector.len()];
        }
        for (acc, x) in sum.iter_mut().zip(vector) {
            *acc += f64::from(*x);
        }
        embedded += 1;
    }

    if embedded == 0 {
        return Err(StudyError::EmbeddingUnavailable {
            chunks: outcomes.len(),
        });
    }

    let n = embedded as f64;
    Ok(DocumentEmbedding {
        vector: sum.into_iter().map(|s| (s / n) as f32).collect(),
        chunks: outcomes.len(),
        failed_chunks: outcomes.len() - embedded,
    })
}

/// Splits, embeds and averages text into one fixed-length vector.
#[derive(Clone)]
pub struct ChunkEmbedder {
    service: Arc<dyn DynEmbeddingService>,
    max_chunk_chars: usize,
    concurrency: usize,
}

impl std::fmt::Debug for ChunkEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkEmbedder")
            .field("max_chunk_chars", &self.max_chunk_chars)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl ChunkEmbedder {
    /// Create an embedder with 1000-character chunks and sequential requests.
    pub fn new(service: impl EmbeddingService + 'static) -> Self {
        Self::new_dyn(Arc::new(service))
    }

    /// Create an embedder from an already type-erased service.
    pub fn new_dyn(service: Arc<dyn DynEmbeddingService>) -> Self {
        Self {
            service,
            max_chunk_chars: MAX_CHUNK_CHARS,
            concurrency: 1,
        }
    }

    /// Build an embedder using the chunk size and concurrency from config.
    pub fn from_config(
        service: Arc<dyn DynEmbeddingService>,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        Ok(Self::new_dyn(service)
            .with_max_chunk_chars(config.max_chunk_chars)?
            .with_concurrency(config.embed_concurrency))
    }

    pub fn with_max_chunk_chars(mut self, max_chunk_chars: usize) -> Result<Self> {
        if max_chunk_chars == 0 {
            return Err(StudyError::InvalidArgument(
                "max_chunk_chars must be greater than 0".to_string(),
            ));
        }
        self.max_chunk_chars = max_chunk_chars;
        Ok(self)
    }

    /// Allow up to `concurrency` chunk requests in flight. Values below 1 mean 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn max_chunk_chars(&self) -> usize {
        self.max_chunk_chars
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Embed `text` and return only the document vector.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_detailed(text).await?.vector)
    }

    /// Embed `text`, returning the vector together with chunk accounting.
    pub async fn embed_detailed(&self, text: &str) -> Result<DocumentEmbedding> {
        if text.trim().is_empty() {
            return Err(StudyError::EmptyInput);
        }

        let chunks = chunk_text(text, self.max_chunk_chars);
        debug!(
            chars = text.chars().count(),
            chunks = chunks.len(),
            max_chunk_chars = self.max_chunk_chars,
            "Split text into chunks"
        );

        let results = self.embed_chunks(&chunks).await;
        let outcomes = classify(results);

        for (i, outcome) in outcomes.iter().enumerate() {
            match outcome {
                ChunkOutcome::Embedded(v) => {
                    debug!(chunk = i + 1, dimensions = v.len(), "Chunk embedded")
                }
                ChunkOutcome::Failed(e) => {
                    warn!(chunk = i + 1, total = outcomes.len(), error = %e, "Chunk embedding failed, skipping")
                }
            }
        }

        let document = aggregate(&outcomes)?;
        info!(
            chunks = document.chunks,
            failed_chunks = document.failed_chunks,
            dimensions = document.dimensions(),
            "Document embedded"
        );
        Ok(document)
    }

    /// Request one embedding per chunk. Results keep chunk order.
    async fn embed_chunks(&self, chunks: &[&str]) -> Vec<Result<Vec<f32>>> {
        if self.concurrency <= 1 {
            let mut results = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                results.push(self.service.embed_boxed(chunk).await);
            }
            return results;
        }

        let requests: Vec<_> = chunks
            .iter()
            .map(|chunk| self.service.embed_boxed(chunk))
            .collect();
        stream::iter(requests)
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
