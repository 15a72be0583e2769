//! Ingest and answer entry points over an explicitly owned index.

use std::path::Path;

use crate::config::Settings;
use crate::decision::{Decision, DecisionEngine, HttpGenerator};
use crate::documents::{Chunker, FileExtractor, SectionChunker, TextExtractor};
use crate::error::{PipelineError, PipelineResult};
use crate::query::{QueryParser, StructuredQuery};
use crate::vector::{EmbeddingIndex, SearchHit};

/// Chunk, index, parse and decide, around a borrowed [`EmbeddingIndex`].
///
/// The index outlives the pipeline; callers persist and restore it at their
/// own checkpoints.
pub struct CoveragePipeline<'a> {
    index: &'a EmbeddingIndex,
    chunker: Box<dyn Chunker>,
    extractor: Box<dyn TextExtractor>,
    parser: QueryParser,
    engine: DecisionEngine,
}

impl<'a> CoveragePipeline<'a> {
    pub fn new(index: &'a EmbeddingIndex, chunker: SectionChunker, engine: DecisionEngine) -> Self {
        Self {
            index,
            chunker: Box::new(chunker),
            extractor: Box::new(FileExtractor::new()),
            parser: QueryParser::new(),
            engine,
        }
    }

    /// Build the chunker and decision engine from settings.
    pub fn from_settings(index: &'a EmbeddingIndex, settings: &Settings) -> PipelineResult<Self> {
        settings.validate().map_err(PipelineError::Config)?;

        let chunker = SectionChunker::from_config(settings.chunking.clone())
            .map_err(|e| PipelineError::Config(format!("chunking.section_pattern: {e}")))?;

        let mut engine = DecisionEngine::new(settings.policy.clone());
        if settings.generation.enabled {
            let generator = HttpGenerator::new(settings.generation.clone())?;
            engine = engine.with_generator(Box::new(generator));
        }

        Ok(Self::new(index, chunker, engine))
    }

    pub fn with_chunker(mut self, chunker: Box<dyn Chunker>) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn with_extractor(mut self, extractor: Box<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn index(&self) -> &EmbeddingIndex {
        self.index
    }

    /// Chunk `raw_text` and add the chunks to the index.
    ///
    /// Returns the number of chunks added; a document that yields no chunks
    /// adds nothing and is not an error.
    pub fn ingest(&self, raw_text: &str, source_id: &str) -> PipelineResult<usize> {
        let chunks = self.chunker.chunk(raw_text, source_id);
        if chunks.is_empty() {
            tracing::warn!(target: "pipeline", "{source_id}: no chunks produced");
            return Ok(0);
        }

        let added = self.index.add(&chunks, source_id)?;
        tracing::info!(target: "pipeline", "{source_id}: indexed {added} chunks");
        Ok(added)
    }

    /// Extract a file's text and ingest it under its file name.
    pub fn ingest_file(&self, path: &Path) -> PipelineResult<usize> {
        let text = self.extractor.extract_text(path)?;
        let source_id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.ingest(&text, &source_id)
    }

    pub fn parse(&self, query_text: &str) -> StructuredQuery {
        self.parser.parse(query_text)
    }

    pub fn search(&self, query_text: &str, top_k: usize) -> PipelineResult<Vec<SearchHit>> {
        Ok(self.index.search(query_text, top_k)?)
    }

    /// Answer a coverage question.
    ///
    /// Never fails: a retrieval failure becomes an `error` decision carrying
    /// the cause.
    pub fn answer(&self, query_text: &str, top_k: usize) -> Decision {
        let query = self.parser.parse(query_text);

        match self.index.search(query_text, top_k) {
            Ok(hits) => self.engine.decide(&query, &hits),
            Err(e) => {
                tracing::error!(target: "pipeline", "search failed: {e}");
                Decision::error(format!("Could not search the policy index: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionStatus;
    use crate::documents::{Chunk, ChunkingConfig, ExtractError};
    use crate::vector::{EmbeddingError, EmbeddingGenerator, HashingEmbedder};
    use std::path::PathBuf;

    struct OfflineGenerator;

    impl EmbeddingGenerator for OfflineGenerator {
        fn generate_embeddings(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Generation("service unreachable".to_string()))
        }

        fn dimension(&self) -> usize {
            8
        }

        fn model_name(&self) -> &str {
            "offline"
        }
    }

    struct NothingChunker;

    impl Chunker for NothingChunker {
        fn chunk(&self, _text: &str, _source_id: &str) -> Vec<Chunk> {
            Vec::new()
        }
    }

    struct RejectingExtractor;

    impl TextExtractor for RejectingExtractor {
        fn extract_text(&self, path: &Path) -> Result<String, ExtractError> {
            Err(ExtractError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: "xlsx".to_string(),
            })
        }
    }

    fn pipeline(index: &EmbeddingIndex) -> CoveragePipeline<'_> {
        CoveragePipeline::new(
            index,
            SectionChunker::new(ChunkingConfig::default()),
            DecisionEngine::default(),
        )
    }

    #[test]
    fn test_ingest_then_answer() {
        let index = EmbeddingIndex::new(Box::new(HashingEmbedder::new(256))).unwrap();
        let pipeline = pipeline(&index);

        let added = pipeline
            .ingest(
                "Knee surgeries are covered up to Rs. 1,00,000. \
                 Cashless treatment is available at network hospitals in Mumbai and Pune.",
                "policy.txt",
            )
            .unwrap();
        assert!(added >= 1);

        let decision = pipeline.answer("46M, knee surgery, Pune, 3-month policy", 5);
        assert_eq!(decision.status(), DecisionStatus::Approved);
        assert_eq!(decision.amount(), 100000.0);
    }

    #[test]
    fn test_answer_on_empty_index_is_no_evidence() {
        let index = EmbeddingIndex::new(Box::new(HashingEmbedder::default())).unwrap();
        let decision = pipeline(&index).answer("knee surgery in Mumbai", 5);

        assert_eq!(decision.status(), DecisionStatus::Rejected);
        assert_eq!(decision.justification_text(), "no relevant policy information found");
    }

    #[test]
    fn test_embedding_failure_rolls_back_ingest() {
        let index = EmbeddingIndex::new(Box::new(OfflineGenerator)).unwrap();
        let pipeline = pipeline(&index);

        assert!(matches!(
            pipeline.ingest("Knee surgery is covered up to Rs. 50,000.", "policy.txt"),
            Err(PipelineError::Index(_))
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_failure_is_error_decision() {
        let index = EmbeddingIndex::new(Box::new(HashingEmbedder::default())).unwrap();
        let decision = pipeline(&index).answer("knee surgery", 0);

        assert_eq!(decision.status(), DecisionStatus::Error);
        assert_eq!(decision.amount(), 0.0);
        assert!(decision.justification_text().contains("top_k"));
    }

    #[test]
    fn test_empty_document_is_not_an_error() {
        let index = EmbeddingIndex::new(Box::new(HashingEmbedder::default())).unwrap();
        let pipeline = pipeline(&index).with_chunker(Box::new(NothingChunker));

        assert_eq!(pipeline.ingest("", "empty.txt").unwrap(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_ingest_file_reports_extraction_errors() {
        let index = EmbeddingIndex::new(Box::new(HashingEmbedder::default())).unwrap();
        let pipeline = pipeline(&index).with_extractor(Box::new(RejectingExtractor));

        let result = pipeline.ingest_file(&PathBuf::from("claims.xlsx"));
        assert!(matches!(
            result,
            Err(PipelineError::Extract(ExtractError::UnsupportedFormat { .. }))
        ));
        assert!(index.is_empty());
    }
}
