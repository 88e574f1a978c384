//! Chunking pipeline orchestrator.

use super::{
    metadata::{calculate_hash, chunk_id, line_range},
    recursive::RecursiveSplitter,
    Chunk, ChunkMetadata,
};
use grounded_core::{AppError, AppResult, ChunkUnit, RagSettings};
use unicode_segmentation::UnicodeSegmentation;

/// Configuration for chunking pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkConfig {
    /// Target maximum chunk length
    pub chunk_size: usize,

    /// Length shared between consecutive chunks
    pub chunk_overlap: usize,

    /// Chunks whose trimmed length falls below this are dropped
    pub minimum_chunk_length: usize,

    /// Unit all lengths are measured in
    pub unit: ChunkUnit,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            minimum_chunk_length: 50,
            unit: ChunkUnit::Characters,
        }
    }
}

impl ChunkConfig {
    pub fn from_settings(settings: &RagSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            minimum_chunk_length: settings.minimum_chunk_length,
            unit: settings.chunk_unit,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.minimum_chunk_length > self.chunk_size {
            return Err(AppError::Config(format!(
                "minimum_chunk_length ({}) must not exceed chunk_size ({})",
                self.minimum_chunk_length, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Length of `text` in the configured unit.
    pub fn measure(&self, text: &str) -> usize {
        match self.unit {
            ChunkUnit::Characters => text.chars().count(),
            ChunkUnit::Words => text.unicode_words().count(),
        }
    }
}

/// Chunks produced from one document plus what was discarded.
#[derive(Debug, Clone, Default)]
pub struct ChunkOutput {
    pub chunks: Vec<Chunk>,
    pub dropped_short: usize,
}

/// Recursive chunking pipeline.
#[derive(Debug, Clone)]
pub struct ChunkPipeline {
    config: ChunkConfig,
}

impl ChunkPipeline {
    /// Create a new pipeline, rejecting inconsistent size settings.
    pub fn new(config: ChunkConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Split `text` into ordered chunks owned by `source_id`.
    pub fn chunk(&self, text: &str, source_id: &str) -> Vec<Chunk> {
        self.chunk_with_metadata(text, source_id, serde_json::Value::Null)
            .chunks
    }

    /// Split `text`, attaching `document` metadata to every chunk.
    pub fn chunk_with_metadata(
        &self,
        text: &str,
        source_id: &str,
        document: serde_json::Value,
    ) -> ChunkOutput {
        if text.trim().is_empty() {
            tracing::debug!("Nothing to chunk for source: {}", source_id);
            return ChunkOutput::default();
        }

        let spans = RecursiveSplitter::new(&self.config).split(text);
        let total_spans = spans.len();

        let mut chunks = Vec::with_capacity(total_spans);
        let mut dropped_short = 0usize;

        for span in spans {
            let slice = &text[span.start..span.end];
            let length = self.config.measure(slice.trim());

            if slice.trim().is_empty() || length < self.config.minimum_chunk_length {
                dropped_short += 1;
                continue;
            }

            let position = chunks.len() as u32;
            chunks.push(Chunk {
                id: chunk_id(source_id, position, slice),
                source: source_id.to_string(),
                position,
                text: slice.to_string(),
                length,
                metadata: ChunkMetadata {
                    byte_range: (span.start, span.end),
                    line_range: line_range(text, span.start, span.end),
                    char_count: slice.chars().count(),
                    hash: calculate_hash(slice),
                    separator: span.separator,
                    document: document.clone(),
                },
            });
        }

        if dropped_short > 0 {
            tracing::debug!(
                "Dropped {} of {} chunks below minimum length {} for source: {}",
                dropped_short,
                total_spans,
                self.config.minimum_chunk_length,
                source_id
            );
        }

        tracing::info!(
            "Chunking complete: {} chunks created from {} bytes",
            chunks.len(),
            text.len()
        );

        ChunkOutput {
            chunks,
            dropped_short,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(size: usize, overlap: usize, min: usize) -> ChunkPipeline {
        ChunkPipeline::new(ChunkConfig {
            chunk_size: size,
            chunk_overlap: overlap,
            minimum_chunk_length: min,
            unit: ChunkUnit::Characters,
        })
        .unwrap()
    }

    /// Rebuild the document from chunk byte ranges, skipping overlap.
    fn reconstruct(text: &str, chunks: &[Chunk]) -> String {
        let mut out = String::new();
        let mut covered = 0usize;
        for chunk in chunks {
            let (start, end) = chunk.metadata.byte_range;
            assert!(start <= covered, "gap before chunk {}", chunk.position);
            if end > covered {
                out.push_str(&text[covered..end]);
                covered = end;
            }
        }
        out
    }

    #[test]
    fn test_pipeline_text() {
        let pipeline = ChunkPipeline::new(ChunkConfig::default()).unwrap();
        let text = "This is a test document. ".repeat(100);

        let chunks = pipeline.chunk(&text, "test-source");
        assert!(chunks.len() > 1);

        for (i, chunk) in chunks.iter().enumerate() {
            assert!(!chunk.text.is_empty());
            assert_eq!(chunk.source, "test-source");
            assert_eq!(chunk.position, i as u32);
            assert!(chunk.length <= 1000);
            assert_eq!(&text[chunk.metadata.byte_range.0..chunk.metadata.byte_range.1], chunk.text);
        }
    }

    #[test]
    fn test_reconstruction_in_order() {
        let pipeline = pipeline(120, 30, 1);
        let text = "Refunds are processed within 30 days of purchase.\n\n\
                    Shipping is free for orders over fifty dollars. Returns must be unopened.\n\
                    Contact support for damaged items.\n\n\
                    Gift cards cannot be refunded or exchanged for cash under any circumstances."
            .to_string();

        let chunks = pipeline.chunk(&text, "policy.txt");
        assert!(chunks.len() > 1);
        assert_eq!(reconstruct(&text, &chunks), text);
    }

    #[test]
    fn test_deterministic_ids() {
        let pipeline = pipeline(60, 10, 1);
        let text = "Alpha beta gamma. ".repeat(20);

        let first = pipeline.chunk(&text, "doc");
        let second = pipeline.chunk(&text, "doc");
        assert_eq!(first, second);

        let other = pipeline.chunk(&text, "other-doc");
        assert_ne!(first[0].id, other[0].id);
    }

    #[test]
    fn test_short_chunks_dropped() {
        let pipeline = pipeline(100, 0, 50);
        let text = "Refunds are processed within 30 days";

        let output = pipeline.chunk_with_metadata(text, "policy.pdf", serde_json::Value::Null);
        assert!(output.chunks.is_empty());
        assert_eq!(output.dropped_short, 1);
    }

    #[test]
    fn test_positions_are_contiguous_after_drop() {
        let pipeline = pipeline(40, 0, 10);
        let text = "A long enough opening paragraph here.\n\nok\n\nAnother sufficiently long paragraph ok.";

        let output = pipeline.chunk_with_metadata(text, "doc", serde_json::Value::Null);
        let positions: Vec<u32> = output.chunks.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(output.dropped_short, 1);
    }

    #[test]
    fn test_empty_and_whitespace_text() {
        let pipeline = pipeline(100, 10, 1);
        assert!(pipeline.chunk("", "doc").is_empty());
        assert!(pipeline.chunk("   \n\n  ", "doc").is_empty());
    }

    #[test]
    fn test_document_metadata_attached() {
        let pipeline = pipeline(100, 10, 1);
        let meta = serde_json::json!({ "page": 3, "title": "Policy" });

        let output = pipeline.chunk_with_metadata("Refunds take 30 days.", "policy.pdf", meta);
        assert_eq!(output.chunks.len(), 1);
        assert_eq!(output.chunks[0].page(), Some(3));
        assert_eq!(output.chunks[0].metadata.line_range, (1, 1));
    }

    #[test]
    fn test_word_unit() {
        let pipeline = ChunkPipeline::new(ChunkConfig {
            chunk_size: 5,
            chunk_overlap: 1,
            minimum_chunk_length: 1,
            unit: ChunkUnit::Words,
        })
        .unwrap();

        let text = "one two three four five six seven eight nine ten eleven twelve";
        let chunks = pipeline.chunk(text, "words");
        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.length <= 5);
        }
    }

    #[test]
    fn test_invalid_config() {
        assert!(ChunkPipeline::new(ChunkConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..ChunkConfig::default()
        })
        .is_err());
        assert!(ChunkPipeline::new(ChunkConfig {
            chunk_size: 0,
            chunk_overlap: 0,
            minimum_chunk_length: 0,
            unit: ChunkUnit::Characters,
        })
        .is_err());
    }

    #[test]
    fn test_pipeline_utf8_safety() {
        let pipeline = pipeline(80, 20, 1);
        let text = "Gamedex é um aplicativo 🎮 brasileiro. \
                    Acentuação: ã, õ, ç, á, é, í, ó, ú, à, â, ê, ô. \
                    Emoji: 🚀 🎯 💡 ✨ 🔥. "
            .repeat(20);

        let chunks = pipeline.chunk(&text, "test-source");
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.metadata.char_count <= 80);
        }
        assert_eq!(reconstruct(&text, &chunks), text);
    }
}
