//! End-to-end run over pre-chunked text.

use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use tracing::info;

use crate::analyzer::ThesisAnalyzer;
use crate::error::{AppError, AppResult};
use crate::models::{BookAnalysis, ChapterAnalysis, Chunk};
use crate::output::{read_json, OutputWriter, RunReport};
use crate::scholarly::supplementary_citations;
use crate::validators::{
    detect_footnotes, disambiguate_thesis_ids, prune_dangling_chains, quality_report,
    validate_citations, validate_theses,
};

/// Load the chunker's output: a JSON array of [`Chunk`].
pub fn load_chunks(path: &Path) -> AppResult<Vec<Chunk>> {
    let chunks: Vec<Chunk> = read_json(path).map_err(|e| AppError::Input {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    info!(path = %path.display(), chunks = chunks.len(), "Chunks loaded");
    Ok(chunks)
}

/// Runs phases 3a-3d (with the 3a+ scholarly supplement) and writes every artifact.
pub struct Pipeline {
    analyzer: ThesisAnalyzer,
    writer: OutputWriter,
    use_cache: bool,
}

impl Pipeline {
    pub fn new(analyzer: ThesisAnalyzer, writer: OutputWriter) -> Self {
        Self {
            analyzer,
            writer,
            use_cache: true,
        }
    }

    /// Reuse per-chapter results from earlier runs (default on).
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Analyze `chunks` and persist the results.
    ///
    /// Malformed model output degrades per phase; a transport error aborts
    /// the run. Chunks analyzed before the abort stay cached.
    pub async fn run(&self, chunks: &[Chunk]) -> AppResult<BookAnalysis> {
        let started_at = Utc::now();
        let timer = Instant::now();

        info!(
            provider = %self.analyzer.provider(),
            extraction_model = %self.analyzer.extraction_model(),
            reasoning_model = %self.analyzer.reasoning_model(),
            chunks = chunks.len(),
            "Phase 3a: extracting theses per chunk"
        );
        let (mut analyses, cached_chunks) = self.analyze_chunks(chunks).await?;

        disambiguate_thesis_ids(&mut analyses);
        let quality = quality_report(&analyses);
        for analysis in &mut analyses {
            analysis.theses = validate_theses(std::mem::take(&mut analysis.theses));
            analysis.citations = validate_citations(std::mem::take(&mut analysis.citations));
        }

        let all_theses: Vec<_> = analyses.iter().flat_map(|a| a.theses.clone()).collect();
        let mut all_citations: Vec<_> = analyses
            .iter()
            .flat_map(|a| a.citations.clone())
            .collect();
        info!(
            theses = all_theses.len(),
            citations = all_citations.len(),
            chunks = chunks.len(),
            "Phase 3a complete"
        );

        info!("Phase 3a+: adding scholarly citations and footnotes");
        let supplementary = supplementary_citations(self.writer.chunks_dir());
        let added = supplementary.len();
        all_citations.extend(supplementary);
        let all_citations = detect_footnotes(all_citations);
        info!(added, citations = all_citations.len(), "Phase 3a+ complete");

        info!("Phase 3b: extracting logical chains");
        let (chains, argument_flow) = self.analyzer.extract_chains(&all_theses).await?;

        info!("Phase 3c: correlating citations");
        let correlation = self
            .analyzer
            .correlate_citations(&all_citations, &all_theses)
            .await?;
        self.writer.save_citation_correlation(&correlation)?;

        info!("Phase 3d: synthesizing final analysis");
        let (theses, summary) = self.analyzer.synthesize(&analyses).await?;
        let chains = prune_dangling_chains(chains, &theses);

        let book = BookAnalysis {
            theses,
            chains,
            citations: all_citations,
            summary,
            argument_flow,
        };
        self.writer.save_book_analysis(&book)?;

        let report = RunReport {
            provider: self.analyzer.provider(),
            extraction_model: self.analyzer.extraction_model().to_string(),
            reasoning_model: self.analyzer.reasoning_model().to_string(),
            chunks: chunks.len(),
            cached_chunks,
            theses: book.theses.len(),
            chains: book.chains.len(),
            citations: book.citations.len(),
            quality,
            started_at,
            finished_at: Utc::now(),
            elapsed_secs: timer.elapsed().as_secs_f64(),
        };
        self.writer.save_run_report(&report)?;

        info!(
            theses = report.theses,
            chains = report.chains,
            citations = report.citations,
            elapsed_secs = report.elapsed_secs,
            output_dir = %self.writer.output_dir().display(),
            "Pipeline complete"
        );
        Ok(book)
    }

    /// Phase 3a over every chunk, in order. Returns the analyses and the cache hit count.
    async fn analyze_chunks(&self, chunks: &[Chunk]) -> AppResult<(Vec<ChapterAnalysis>, usize)> {
        let mut analyses = Vec::with_capacity(chunks.len());
        let mut cached = 0usize;

        for (index, chunk) in chunks.iter().enumerate() {
            if self.use_cache {
                if let Some(analysis) = self.writer.load_chapter_analysis(index) {
                    info!(
                        chunk = index + 1,
                        total = chunks.len(),
                        title = %chunk.title,
                        theses = analysis.theses.len(),
                        "Using cached chunk analysis"
                    );
                    analyses.push(analysis);
                    cached += 1;
                    continue;
                }
            }

            info!(
                chunk = index + 1,
                total = chunks.len(),
                title = %chunk.title,
                chars = chunk.char_count,
                "Analyzing chunk"
            );
            let analysis = self.analyzer.analyze_chunk(chunk).await?;
            self.writer.save_chapter_analysis(&analysis, index)?;
            analyses.push(analysis);
        }

        Ok((analyses, cached))
    }
}
