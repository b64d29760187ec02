//! Semantic filtering of candidate questions against a free-text query.
//!
//! Candidates and query are embedded with the same model, ranked by exact
//! squared-L2 search, scored as `1 / (1 + distance)`, and every candidate
//! within 5% of the best score is kept. A cluster of near-equal matches
//! comes back together; a dominant match comes back alone.

use crate::catalog::Question;
use crate::embedding::Embedder;
use crate::error::{Result, SvarError};
use crate::index::{FlatIndex, Neighbor};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Fraction of the best score a candidate must reach to be returned.
pub const RELATIVE_THRESHOLD: f32 = 0.95;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A candidate that passed the relative threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityResult {
    /// Similarity in (0, 1]; higher is closer.
    pub score: f32,
    /// Position of the candidate in the slice that was searched.
    pub index: usize,
}

/// Map a squared distance to a similarity score in (0, 1].
pub fn similarity_score(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

/// Keep the neighbors whose score is within the relative band of the nearest.
///
/// `neighbors` must be ordered nearest first; the output keeps that order.
pub fn relative_band(neighbors: &[Neighbor]) -> Vec<SimilarityResult> {
    let Some(best) = neighbors.first() else {
        return Vec::new();
    };
    let lower_bound = similarity_score(best.distance) * RELATIVE_THRESHOLD;

    neighbors
        .iter()
        .map(|n| SimilarityResult {
            score: similarity_score(n.distance),
            index: n.index,
        })
        .filter(|r| r.score >= lower_bound)
        .collect()
}

/// Ranks candidate questions against a query.
pub struct SemanticFilter {
    embedder: Arc<dyn Embedder>,
    timeout: Duration,
}

impl SemanticFilter {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Bound each embedding call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Candidates closest to `query`, nearest first.
    ///
    /// An empty candidate list returns an empty result without embedding
    /// anything. A non-empty list always yields at least the best match.
    #[instrument(skip(self, candidates), fields(candidates = candidates.len()))]
    pub async fn search(&self, query: &str, candidates: &[Question]) -> Result<Vec<SimilarityResult>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = candidates.iter().map(|q| q.question.clone()).collect();
        let candidate_embeddings = self
            .bounded("embedding candidate questions", self.embedder.embed_batch(&texts))
            .await?;
        if candidate_embeddings.len() != candidates.len() {
            return Err(SvarError::Query(format!(
                "Expected {} candidate embeddings, got {}",
                candidates.len(),
                candidate_embeddings.len()
            )));
        }

        let query_embedding = self
            .bounded("embedding query", self.embedder.embed(query))
            .await?;

        let index = FlatIndex::build(candidate_embeddings)?;
        let neighbors = index.search(&query_embedding, index.len())?;
        let results = relative_band(&neighbors);

        debug!(
            "{} of {} candidates within {:.0}% of best score",
            results.len(),
            candidates.len(),
            RELATIVE_THRESHOLD * 100.0
        );
        Ok(results)
    }

    async fn bounded<T>(&self, operation: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e @ SvarError::Timeout { .. })) => Err(e),
            Ok(Err(SvarError::Query(msg))) => Err(SvarError::Query(msg)),
            Ok(Err(e)) => Err(SvarError::Query(format!("{} failed: {}", operation, e))),
            Err(_) => Err(SvarError::Timeout {
                operation: operation.to_string(),
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}
