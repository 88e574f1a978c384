//! In-memory vector index with copy-on-write snapshots.
//!
//! The whole index state is an immutable [`IndexSnapshot`] behind an
//! `Arc`. Searches clone the `Arc` and run without holding any lock.
//! Writers build a modified copy and swap it in, so a search always sees
//! the index either entirely before or entirely after a mutation.

use crate::chunk::Chunk;
use crate::embeddings::EmbeddingIdentity;
use crate::snapshot::{
    read_snapshot, write_snapshot, PersistedChunk, PersistedSnapshot, SNAPSHOT_FORMAT_VERSION,
};
use crate::types::{
    AddOutcome, ChunkFailure, EmbeddedChunk, IndexStats, RetrievalResult, RetrievedChunk,
    SourceInfo,
};
use crate::vector_index::VectorIndex;
use chrono::{DateTime, Utc};
use grounded_core::{AppError, AppResult};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct IndexedVector {
    chunk: Chunk,
    embedding: Vec<f32>,
    norm: f32,
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity clamped to `[0, 1]`; zero vectors score 0.
fn cosine(query: &[f32], query_norm: f32, entry: &IndexedVector) -> f32 {
    if query_norm == 0.0 || entry.norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(&entry.embedding).map(|(a, b)| a * b).sum();
    let score = dot / (query_norm * entry.norm);
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Point-in-time view of the index.
///
/// Entries are shared between snapshots; cloning copies pointers, not
/// vectors.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    identity: EmbeddingIdentity,
    entries: Vec<Arc<IndexedVector>>,
    /// Chunk id to position in `entries`
    slots: HashMap<String, usize>,
    indexed_at: BTreeMap<String, DateTime<Utc>>,
}

impl IndexSnapshot {
    fn empty(identity: EmbeddingIdentity) -> Self {
        Self {
            identity,
            entries: Vec::new(),
            slots: HashMap::new(),
            indexed_at: BTreeMap::new(),
        }
    }

    pub fn identity(&self) -> &EmbeddingIdentity {
        &self.identity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_source(&self, source_id: &str) -> bool {
        self.indexed_at.contains_key(source_id)
    }

    /// The `top_k` chunks most similar to `query`.
    ///
    /// Ordered by descending score, then ascending position, then ascending
    /// source id. Ranks start at 1.
    pub fn search(&self, query: &[f32], top_k: usize) -> AppResult<RetrievalResult> {
        if top_k == 0 || self.entries.is_empty() {
            return Ok(RetrievalResult::default());
        }

        if query.len() != self.identity.dimensions {
            return Err(AppError::Retrieval(format!(
                "Query vector has {} dimensions, index holds {}",
                query.len(),
                self.identity.dimensions
            )));
        }

        let query_norm = l2_norm(query);
        let mut scored: Vec<(&IndexedVector, f32)> = self
            .entries
            .iter()
            .map(|entry| (entry.as_ref(), cosine(query, query_norm, entry)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| a.0.chunk.position.cmp(&b.0.chunk.position))
                .then_with(|| a.0.chunk.source.cmp(&b.0.chunk.source))
        });
        scored.truncate(top_k);

        let candidates = scored
            .into_iter()
            .enumerate()
            .map(|(i, (entry, score))| RetrievedChunk {
                chunk: entry.chunk.clone(),
                score,
                rank: i + 1,
            })
            .collect();

        Ok(RetrievalResult::new(candidates))
    }

    /// Per-source chunk counts, ordered by source id.
    pub fn sources(&self) -> Vec<SourceInfo> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.chunk.source.as_str()).or_insert(0) += 1;
        }

        self.indexed_at
            .iter()
            .map(|(source_id, indexed_at)| SourceInfo {
                source_id: source_id.clone(),
                chunk_count: counts.get(source_id.as_str()).copied().unwrap_or(0),
                indexed_at: *indexed_at,
            })
            .collect()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            sources: self.indexed_at.len(),
            chunks: self.entries.len(),
            dimensions: self.identity.dimensions,
        }
    }

    /// Check one chunk against the index identity, returning its norm.
    fn validate(&self, embedded: &EmbeddedChunk) -> Result<f32, String> {
        if embedded.embedding.len() != self.identity.dimensions {
            return Err(format!(
                "embedding has {} dimensions, index expects {}",
                embedded.embedding.len(),
                self.identity.dimensions
            ));
        }
        if embedded.embedding.iter().any(|v| !v.is_finite()) {
            return Err("embedding contains non-finite values".to_string());
        }
        if embedded.chunk.source.is_empty() {
            return Err("chunk has no source".to_string());
        }
        Ok(l2_norm(&embedded.embedding))
    }

    fn upsert(&mut self, embedded: EmbeddedChunk, norm: f32, now: DateTime<Utc>) {
        self.indexed_at
            .entry(embedded.chunk.source.clone())
            .or_insert(now);

        let entry = Arc::new(IndexedVector {
            chunk: embedded.chunk,
            embedding: embedded.embedding,
            norm,
        });

        match self.slots.get(&entry.chunk.id) {
            Some(&slot) => self.entries[slot] = entry,
            None => {
                self.slots.insert(entry.chunk.id.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    fn remove_source(&mut self, source_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.chunk.source != source_id);
        self.indexed_at.remove(source_id);

        let removed = before - self.entries.len();
        if removed > 0 {
            self.slots = self
                .entries
                .iter()
                .enumerate()
                .map(|(slot, e)| (e.chunk.id.clone(), slot))
                .collect();
        }
        removed
    }

    fn to_persisted(&self) -> PersistedSnapshot {
        PersistedSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            identity: self.identity.clone(),
            created_at: Utc::now(),
            sources: self.sources(),
            chunks: self
                .entries
                .iter()
                .map(|e| PersistedChunk {
                    chunk: e.chunk.clone(),
                    embedding: e.embedding.clone(),
                })
                .collect(),
        }
    }
}

/// Validated chunks plus the ones that were rejected.
struct Prepared {
    accepted: Vec<(EmbeddedChunk, f32)>,
    failures: Vec<ChunkFailure>,
}

/// Owns every stored vector and chunk.
pub struct IndexManager {
    identity: EmbeddingIdentity,
    state: RwLock<Arc<IndexSnapshot>>,
}

impl IndexManager {
    /// Create an empty index for vectors produced by `identity`.
    pub fn new(identity: EmbeddingIdentity) -> Self {
        Self {
            state: RwLock::new(Arc::new(IndexSnapshot::empty(identity.clone()))),
            identity,
        }
    }

    /// Current point-in-time view. Later mutations do not affect it.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.state.read())
    }

    fn prepare(&self, chunks: Vec<EmbeddedChunk>) -> Prepared {
        let current = self.snapshot();
        let mut prepared = Prepared {
            accepted: Vec::with_capacity(chunks.len()),
            failures: Vec::new(),
        };

        for embedded in chunks {
            match current.validate(&embedded) {
                Ok(norm) => prepared.accepted.push((embedded, norm)),
                Err(reason) => {
                    tracing::warn!(
                        "Rejected chunk {} of '{}': {}",
                        embedded.chunk.position,
                        embedded.chunk.source,
                        reason
                    );
                    prepared.failures.push(ChunkFailure {
                        chunk_id: embedded.chunk.id,
                        position: embedded.chunk.position,
                        reason,
                    });
                }
            }
        }

        prepared
    }

    /// Insert or update chunks in one swap.
    ///
    /// Each chunk is validated on its own; a bad chunk is reported in the
    /// outcome and does not stop the rest of the batch.
    pub fn add(&self, chunks: Vec<EmbeddedChunk>) -> AddOutcome {
        let Prepared { accepted, failures } = self.prepare(chunks);
        let committed = accepted.len();

        if committed > 0 {
            let now = Utc::now();
            let mut state = self.state.write();
            let mut next = IndexSnapshot::clone(&state);
            for (embedded, norm) in accepted {
                next.upsert(embedded, norm, now);
            }
            *state = Arc::new(next);
        }

        tracing::debug!(
            "Added {} chunks to index ({} rejected)",
            committed,
            failures.len()
        );

        AddOutcome {
            committed,
            failures,
        }
    }

    /// Replace every chunk of `source_id` with `chunks` in one swap.
    ///
    /// Returns the add outcome and the number of chunks replaced. When every
    /// new chunk is rejected the previous chunks are kept.
    pub fn replace_source(
        &self,
        source_id: &str,
        chunks: Vec<EmbeddedChunk>,
    ) -> (AddOutcome, usize) {
        let (matching, foreign): (Vec<_>, Vec<_>) = chunks
            .into_iter()
            .partition(|c| c.chunk.source == source_id);

        let Prepared {
            accepted,
            mut failures,
        } = self.prepare(matching);

        failures.extend(foreign.into_iter().map(|c| ChunkFailure {
            chunk_id: c.chunk.id,
            position: c.chunk.position,
            reason: format!("chunk belongs to '{}', not '{}'", c.chunk.source, source_id),
        }));

        if accepted.is_empty() && !failures.is_empty() {
            tracing::warn!(
                "No chunk of '{}' could be stored; keeping the previous version",
                source_id
            );
            return (
                AddOutcome {
                    committed: 0,
                    failures,
                },
                0,
            );
        }

        let committed = accepted.len();
        let now = Utc::now();

        let mut state = self.state.write();
        let mut next = IndexSnapshot::clone(&state);
        let replaced = next.remove_source(source_id);
        for (embedded, norm) in accepted {
            next.upsert(embedded, norm, now);
        }
        *state = Arc::new(next);
        drop(state);

        if replaced > 0 {
            tracing::info!(
                "Replaced {} chunks of '{}' with {}",
                replaced,
                source_id,
                committed
            );
        }

        (
            AddOutcome {
                committed,
                failures,
            },
            replaced,
        )
    }

    /// Remove all chunks of `source_id`.
    pub fn remove(&self, source_id: &str) -> usize {
        let mut state = self.state.write();
        if !state.contains_source(source_id) {
            return 0;
        }

        let mut next = IndexSnapshot::clone(&state);
        let removed = next.remove_source(source_id);
        *state = Arc::new(next);

        tracing::info!("Removed {} chunks of '{}'", removed, source_id);
        removed
    }

    pub fn search(&self, query: &[f32], top_k: usize) -> AppResult<RetrievalResult> {
        self.snapshot().search(query, top_k)
    }

    pub fn stats(&self) -> IndexStats {
        self.snapshot().stats()
    }

    pub fn sources(&self) -> Vec<SourceInfo> {
        self.snapshot().sources()
    }

    /// Write the current snapshot to `path`.
    pub fn persist(&self, path: &Path) -> AppResult<()> {
        let snapshot = self.snapshot();
        write_snapshot(path, &snapshot.to_persisted())?;
        tracing::info!(
            "Persisted {} chunks from {} sources to {:?}",
            snapshot.len(),
            snapshot.indexed_at.len(),
            path
        );
        Ok(())
    }

    /// Replace the in-memory index with the snapshot at `path`.
    ///
    /// A snapshot produced by a different embedder is a configuration error.
    pub fn load(&self, path: &Path) -> AppResult<usize> {
        let persisted = read_snapshot(path)?;
        self.identity.validate_consistency(&persisted.identity)?;

        let mut next = IndexSnapshot::empty(self.identity.clone());
        for source in &persisted.sources {
            next.indexed_at
                .insert(source.source_id.clone(), source.indexed_at);
        }

        let now = Utc::now();
        for stored in persisted.chunks {
            let embedded = EmbeddedChunk {
                chunk: stored.chunk,
                embedding: stored.embedding,
            };
            let norm = next.validate(&embedded).map_err(|reason| {
                AppError::Index(format!(
                    "Snapshot {:?} holds an invalid chunk {}: {}",
                    path, embedded.chunk.id, reason
                ))
            })?;
            next.upsert(embedded, norm, now);
        }

        let count = next.len();
        *self.state.write() = Arc::new(next);

        tracing::info!("Loaded {} chunks from {:?}", count, path);
        Ok(count)
    }
}

impl VectorIndex for IndexManager {
    fn identity(&self) -> &EmbeddingIdentity {
        &self.identity
    }

    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<RetrievalResult> {
        IndexManager::search(self, query_embedding, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::test_chunk;
    use tempfile::TempDir;

    fn identity() -> EmbeddingIdentity {
        EmbeddingIdentity::new("stub", "stub-v1", 2)
    }

    fn embedded(source: &str, position: u32, text: &str, embedding: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: test_chunk(source, position, text),
            embedding,
        }
    }

    fn populated() -> IndexManager {
        let index = IndexManager::new(identity());
        let outcome = index.add(vec![
            embedded("a.txt", 0, "alpha", vec![1.0, 0.0]),
            embedded("a.txt", 1, "beta", vec![0.6, 0.8]),
            embedded("b.txt", 0, "gamma", vec![0.0, 1.0]),
        ]);
        assert_eq!(outcome.committed, 3);
        index
    }

    #[test]
    fn test_search_orders_by_score() {
        let index = populated();
        let result = index.search(&[1.0, 0.0], 3).unwrap();

        let texts: Vec<&str> = result.candidates.iter().map(|c| c.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "beta", "gamma"]);
        assert!((result.candidates[0].score - 1.0).abs() < 1e-6);
        assert!((result.candidates[1].score - 0.6).abs() < 1e-6);
        assert_eq!(result.candidates[2].score, 0.0);

        let ranks: Vec<usize> = result.candidates.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_search_respects_top_k() {
        let index = populated();
        assert_eq!(index.search(&[1.0, 0.0], 2).unwrap().len(), 2);
        assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_tie_break_by_position_then_source() {
        let index = IndexManager::new(identity());
        index.add(vec![
            embedded("z.txt", 0, "same z0", vec![1.0, 0.0]),
            embedded("a.txt", 1, "same a1", vec![1.0, 0.0]),
            embedded("a.txt", 0, "same a0", vec![1.0, 0.0]),
        ]);

        let result = index.search(&[1.0, 0.0], 3).unwrap();
        let order: Vec<(&str, u32)> = result
            .candidates
            .iter()
            .map(|c| (c.chunk.source.as_str(), c.chunk.position))
            .collect();
        assert_eq!(order, vec![("a.txt", 0), ("z.txt", 0), ("a.txt", 1)]);
    }

    #[test]
    fn test_negative_similarity_clamped() {
        let index = IndexManager::new(identity());
        index.add(vec![embedded("a.txt", 0, "opposite", vec![-1.0, 0.0])]);

        let result = index.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(result.candidates[0].score, 0.0);
    }

    #[test]
    fn test_empty_index_returns_empty() {
        let index = IndexManager::new(identity());
        assert!(index.search(&[1.0, 0.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = populated();
        let err = index.search(&[1.0, 0.0, 0.0], 3).unwrap_err();
        assert!(matches!(err, AppError::Retrieval(_)));
    }

    #[test]
    fn test_bad_chunks_reported_individually() {
        let index = IndexManager::new(identity());
        let outcome = index.add(vec![
            embedded("a.txt", 0, "good", vec![1.0, 0.0]),
            embedded("a.txt", 1, "wrong dims", vec![1.0, 0.0, 0.0]),
            embedded("a.txt", 2, "nan", vec![f32::NAN, 0.0]),
        ]);

        assert_eq!(outcome.committed, 1);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.failures[0].position, 1);
        assert!(outcome.failures[1].reason.contains("non-finite"));
        assert_eq!(index.stats().chunks, 1);
    }

    #[test]
    fn test_add_same_chunk_twice_is_upsert() {
        let index = IndexManager::new(identity());
        index.add(vec![embedded("a.txt", 0, "alpha", vec![1.0, 0.0])]);
        index.add(vec![embedded("a.txt", 0, "alpha", vec![0.0, 1.0])]);

        assert_eq!(index.stats().chunks, 1);
        let result = index.search(&[0.0, 1.0], 1).unwrap();
        assert!((result.candidates[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_upsert_after_removal_keeps_slots_consistent() {
        let index = populated();
        index.remove("a.txt");
        index.add(vec![
            embedded("b.txt", 0, "gamma", vec![1.0, 0.0]),
            embedded("c.txt", 0, "delta", vec![0.6, 0.8]),
        ]);

        assert_eq!(index.stats().chunks, 2);
        let result = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(result.candidates[0].chunk.text, "gamma");
        assert!((result.candidates[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mutation_shares_unchanged_entries() {
        let index = populated();
        let before = index.snapshot();

        index.add(vec![embedded("c.txt", 0, "delta", vec![1.0, 0.0])]);
        let after = index.snapshot();

        assert_eq!(after.len(), 4);
        for (old, new) in before.entries.iter().zip(&after.entries) {
            assert!(Arc::ptr_eq(old, new));
        }
    }

    #[test]
    fn test_large_batch_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snapshot.json");

        let index = IndexManager::new(identity());
        let batch: Vec<EmbeddedChunk> = (0..10_000u32)
            .map(|i| {
                let angle = i as f32 / 10_000.0;
                embedded("bulk.txt", i, &format!("chunk {}", i), vec![angle.cos(), angle.sin()])
            })
            .collect();
        assert_eq!(index.add(batch).committed, 10_000);
        index.persist(&path).unwrap();

        let restored = IndexManager::new(identity());
        assert_eq!(restored.load(&path).unwrap(), 10_000);
        assert_eq!(restored.snapshot().slots.len(), 10_000);
        assert_eq!(
            restored.search(&[1.0, 0.0], 1).unwrap().candidates[0].chunk.position,
            0
        );
    }

    #[test]
    fn test_search_through_trait_object() {
        let index: Arc<dyn VectorIndex> = Arc::new(populated());
        assert_eq!(index.identity(), &identity());
        assert_eq!(index.search(&[0.0, 1.0], 1).unwrap().candidates[0].chunk.text, "gamma");
    }

    #[test]
    fn test_remove_source() {
        let index = populated();
        assert_eq!(index.remove("a.txt"), 2);
        assert_eq!(index.remove("a.txt"), 0);

        let result = index.search(&[1.0, 0.0], 3).unwrap();
        assert!(result.candidates.iter().all(|c| c.chunk.source == "b.txt"));
        assert_eq!(index.stats().sources, 1);
    }

    #[test]
    fn test_snapshot_isolated_from_later_mutation() {
        let index = populated();
        let before = index.snapshot();

        index.remove("a.txt");

        let old = before.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(old.len(), 3);
        assert_eq!(old.candidates[0].chunk.source, "a.txt");
        assert_eq!(index.search(&[1.0, 0.0], 3).unwrap().len(), 1);
    }

    #[test]
    fn test_replace_source() {
        let index = populated();
        let (outcome, replaced) = index.replace_source(
            "a.txt",
            vec![embedded("a.txt", 0, "alpha v2", vec![1.0, 0.0])],
        );

        assert_eq!(replaced, 2);
        assert_eq!(outcome.committed, 1);
        assert_eq!(index.stats().chunks, 2);

        let result = index.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(result.candidates[0].chunk.text, "alpha v2");
    }

    #[test]
    fn test_replace_source_keeps_old_when_all_rejected() {
        let index = populated();
        let (outcome, replaced) = index.replace_source(
            "a.txt",
            vec![embedded("a.txt", 0, "bad", vec![1.0])],
        );

        assert_eq!(replaced, 0);
        assert_eq!(outcome.committed, 0);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(index.stats().chunks, 3);
    }

    #[test]
    fn test_sources_listing() {
        let index = populated();
        let sources = index.sources();
        let summary: Vec<(&str, usize)> = sources
            .iter()
            .map(|s| (s.source_id.as_str(), s.chunk_count))
            .collect();
        assert_eq!(summary, vec![("a.txt", 2), ("b.txt", 1)]);
    }

    #[test]
    fn test_persist_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".grounded/index/snapshot.json");

        let index = populated();
        index.persist(&path).unwrap();

        let restored = IndexManager::new(identity());
        assert_eq!(restored.load(&path).unwrap(), 3);
        assert_eq!(restored.stats(), index.stats());
        assert_eq!(
            restored.search(&[0.6, 0.8], 1).unwrap().candidates[0].chunk.text,
            "beta"
        );
        assert_eq!(restored.sources()[0].indexed_at, index.sources()[0].indexed_at);
    }

    #[test]
    fn test_load_rejects_other_identity() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snapshot.json");
        populated().persist(&path).unwrap();

        let other = IndexManager::new(EmbeddingIdentity::new("stub", "stub-v2", 2));
        let err = other.load(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(other.snapshot().is_empty());
    }
}
