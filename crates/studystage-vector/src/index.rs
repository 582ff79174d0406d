//! Append-only in-memory similarity index with brute-force cosine ranking.
//!
//! Records are kept in insertion order behind an `RwLock`: searches rank a
//! consistent snapshot under a read lock, while inserts embed their text first
//! and only take the write lock for the final append. All records share one
//! vector dimensionality, fixed by the first insertion.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use studystage_core::error::{Result, StudyError};
use studystage_core::types::{metadata_filename, Metadata};

use crate::embedder::ChunkEmbedder;

/// Number of hits returned when the caller does not choose.
pub const DEFAULT_TOP_K: usize = 5;

/// One stored document. Never mutated after insertion.
#[derive(Debug, Clone)]
pub struct Record {
    vector: Vec<f32>,
    text: String,
    metadata: Metadata,
}

impl Record {
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// A single ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    pub metadata: Metadata,
    /// Raw cosine similarity in `[-1.0, 1.0]`.
    pub score: f64,
}

/// Outcome of an insert call that did not error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InsertOutcome {
    Stored {
        /// Zero-based insertion position.
        position: usize,
        dimensions: usize,
        chunks: usize,
        failed_chunks: usize,
    },
    /// Nothing to index (e.g. whitespace-only text).
    Skipped { reason: String },
}

/// Lightweight listing entry for a stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub position: usize,
    pub filename: Option<String>,
    pub preview: String,
    pub chars: usize,
    pub metadata: Metadata,
}

#[derive(Debug, Default)]
struct Records {
    dimensions: Option<usize>,
    items: Vec<Record>,
}

/// In-memory semantic index over embedded documents.
///
/// Owned by whoever composes the application and shared by handle
/// (`Arc<SimilarityIndex>`). Many concurrent searches, one writer at a time.
#[derive(Debug)]
pub struct SimilarityIndex {
    embedder: ChunkEmbedder,
    records: RwLock<Records>,
}

impl SimilarityIndex {
    /// Create an empty index that embeds through `embedder`.
    pub fn new(embedder: ChunkEmbedder) -> Self {
        Self {
            embedder,
            records: RwLock::new(Records::default()),
        }
    }

    pub fn embedder(&self) -> &ChunkEmbedder {
        &self.embedder
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Records>> {
        self.records
            .read()
            .map_err(|e| StudyError::Internal(format!("index lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Records>> {
        self.records
            .write()
            .map_err(|e| StudyError::Internal(format!("index lock poisoned: {}", e)))
    }

    /// Embed `text` and append it as a new record.
    ///
    /// Whitespace-only text is skipped with a warning rather than an error.
    /// If no chunk could be embedded the error is returned and nothing is
    /// stored.
    pub async fn insert(&self, text: &str, metadata: Metadata) -> Result<InsertOutcome> {
        if text.trim().is_empty() {
            warn!("Skipping empty document text");
            return Ok(InsertOutcome::Skipped {
                reason: "Empty document text".to_string(),
            });
        }

        let document = self.embedder.embed_detailed(text).await?;
        let dimensions = document.dimensions();
        let position = self.append(document.vector, text.to_string(), metadata)?;

        info!(
            position,
            dimensions,
            chars = text.chars().count(),
            "Document indexed"
        );
        Ok(InsertOutcome::Stored {
            position,
            dimensions,
            chunks: document.chunks,
            failed_chunks: document.failed_chunks,
        })
    }

    /// Append a record, enforcing the index-wide dimensionality.
    fn append(&self, vector: Vec<f32>, text: String, metadata: Metadata) -> Result<usize> {
        let mut records = self.write()?;
        match records.dimensions {
            Some(expected) if expected != vector.len() => {
                return Err(StudyError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
            None => records.dimensions = Some(vector.len()),
        }
        records.items.push(Record {
            vector,
            text,
            metadata,
        });
        Ok(records.items.len() - 1)
    }

    /// Return the `top_k` records most similar to `query`, best first.
    ///
    /// An empty index yields an empty list without contacting the embedding
    /// service. Equal scores keep insertion order.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(StudyError::EmptyInput);
        }
        if top_k == 0 {
            return Err(StudyError::InvalidArgument(
                "top_k must be a positive integer".to_string(),
            ));
        }
        if self.is_empty() {
            warn!("Search on empty index, nothing indexed yet");
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed(query).await?;
        let hits = self.rank(&query_vec, top_k)?;
        debug!(top_k, returned = hits.len(), "Search complete");
        Ok(hits)
    }

    /// Rank every stored record against an already embedded query vector.
    fn rank(&self, query_vec: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let records = self.read()?;
        if let Some(expected) = records.dimensions {
            if expected != query_vec.len() {
                return Err(StudyError::DimensionMismatch {
                    expected,
                    actual: query_vec.len(),
                });
            }
        }

        let mut scored: Vec<(usize, f64)> = records
            .items
            .iter()
            .enumerate()
            .map(|(i, r)| (i, cosine_similarity(query_vec, &r.vector)))
            .collect();

        // Stable sort: ties keep insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| {
                let record = &records.items[i];
                SearchHit {
                    text: record.text.clone(),
                    metadata: record.metadata.clone(),
                    score,
                }
            })
            .collect())
    }

    /// Summaries of all stored documents in insertion order.
    pub fn documents(&self, preview_chars: usize) -> Result<Vec<DocumentSummary>> {
        let records = self.read()?;
        Ok(records
            .items
            .iter()
            .enumerate()
            .map(|(position, r)| DocumentSummary {
                position,
                filename: metadata_filename(&r.metadata).map(String::from),
                preview: r.text.chars().take(preview_chars).collect(),
                chars: r.text.chars().count(),
                metadata: r.metadata.clone(),
            })
            .collect())
    }

    /// Clone out the record stored at `position`, if any.
    pub fn get(&self, position: usize) -> Option<Record> {
        self.read().ok().and_then(|r| r.items.get(position).cloned())
    }

    /// Shared dimensionality of stored vectors, once anything is stored.
    pub fn dimensions(&self) -> Option<usize> {
        self.read().ok().and_then(|r| r.dimensions)
    }

    /// Return the number of records currently stored.
    pub fn len(&self) -> usize {
        self.read().map(|r| r.items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();

    let mag_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
