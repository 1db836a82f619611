//! JSON artifacts of a run.
//!
//! Layout under the output directory:
//!
//! ```text
//! per_chapter/chapter_NN_theses.json   one ChapterAnalysis per chunk (resume cache)
//! theses.json, chains.json, citations.json
//! book_analysis.json
//! citation_groups.json
//! run_report.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::OutputConfig;
use crate::error::{OutputError, OutputResult};
use crate::llm::Provider;
use crate::models::{BookAnalysis, ChapterAnalysis, CitationCorrelation};
use crate::validators::QualityReport;

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub provider: Provider,
    pub extraction_model: String,
    pub reasoning_model: String,
    pub chunks: usize,
    /// Chunks whose analysis came from the per-chapter cache.
    pub cached_chunks: usize,
    pub theses: usize,
    pub chains: usize,
    pub citations: usize,
    pub quality: QualityReport,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_secs: f64,
}

/// Paths written by [`OutputWriter::save_book_analysis`].
#[derive(Debug, Clone)]
pub struct BookArtifacts {
    pub theses: PathBuf,
    pub chains: PathBuf,
    pub citations: PathBuf,
    pub book_analysis: PathBuf,
}

/// Writes analysis results as pretty-printed UTF-8 JSON.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    output_dir: PathBuf,
    chunks_dir: PathBuf,
    per_chapter_dir: PathBuf,
}

impl OutputWriter {
    /// Create the writer and its directories.
    pub fn new(config: &OutputConfig) -> OutputResult<Self> {
        let writer = Self {
            output_dir: config.output_dir.clone(),
            chunks_dir: config.chunks_dir(),
            per_chapter_dir: config.per_chapter_dir(),
        };
        for dir in [
            &writer.output_dir,
            &writer.chunks_dir,
            &writer.per_chapter_dir,
        ] {
            fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        }
        debug!(output_dir = %writer.output_dir.display(), "Output directories ready");
        Ok(writer)
    }

    /// Root output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Chunker output directory, also home of the notes chunk.
    pub fn chunks_dir(&self) -> &Path {
        &self.chunks_dir
    }

    /// Cache file for the chunk at `index`.
    pub fn chapter_path(&self, index: usize) -> PathBuf {
        self.per_chapter_dir
            .join(format!("chapter_{:02}_theses.json", index))
    }

    pub fn save_chapter_analysis(
        &self,
        analysis: &ChapterAnalysis,
        index: usize,
    ) -> OutputResult<PathBuf> {
        let path = self.chapter_path(index);
        write_json(&path, analysis)?;
        debug!(path = %path.display(), theses = analysis.theses.len(), "Chapter analysis saved");
        Ok(path)
    }

    /// Cached analysis for `index`, or `None` when absent or unreadable.
    pub fn load_chapter_analysis(&self, index: usize) -> Option<ChapterAnalysis> {
        let path = self.chapter_path(index);
        if !path.exists() {
            return None;
        }
        match read_json(&path) {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable chapter cache");
                None
            }
        }
    }

    pub fn save_citation_correlation(
        &self,
        correlation: &CitationCorrelation,
    ) -> OutputResult<PathBuf> {
        let path = self.output_dir.join("citation_groups.json");
        write_json(&path, correlation)?;
        info!(path = %path.display(), "Citation correlation saved");
        Ok(path)
    }

    /// Write the entity arrays and the full aggregate.
    pub fn save_book_analysis(&self, analysis: &BookAnalysis) -> OutputResult<BookArtifacts> {
        let artifacts = BookArtifacts {
            theses: self.output_dir.join("theses.json"),
            chains: self.output_dir.join("chains.json"),
            citations: self.output_dir.join("citations.json"),
            book_analysis: self.output_dir.join("book_analysis.json"),
        };

        write_json(&artifacts.theses, &analysis.theses)?;
        write_json(&artifacts.chains, &analysis.chains)?;
        write_json(&artifacts.citations, &analysis.citations)?;
        write_json(&artifacts.book_analysis, analysis)?;

        info!(
            output_dir = %self.output_dir.display(),
            theses = analysis.theses.len(),
            chains = analysis.chains.len(),
            citations = analysis.citations.len(),
            "Book analysis saved"
        );
        Ok(artifacts)
    }

    pub fn save_run_report(&self, report: &RunReport) -> OutputResult<PathBuf> {
        let path = self.output_dir.join("run_report.json");
        write_json(&path, report)?;
        Ok(path)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> OutputError {
    OutputError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> OutputResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| io_error(path, e))
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> OutputResult<T> {
    let raw = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    Ok(serde_json::from_str(&raw)?)
}
