//! # Thesis Mining
//!
//! Argument mining over "Cristianismo Basico" (John Stott): LLM-driven
//! extraction of theses, the logical chains between them, and the biblical,
//! scholarly and footnote citations that support them.
//!
//! ## Phases
//!
//! - **3a** Thesis and citation extraction per chunk (fast extraction model)
//! - **3a+** Scholarly references and footnotes from the book's notes
//! - **3b** Chain extraction across all theses (reasoning model)
//! - **3c** Thematic citation correlation
//! - **3d** Per-part deduplication, then bounded global synthesis
//!
//! ## Architecture
//!
//! ```text
//! chunks.json → Pipeline → ThesisAnalyzer → LlmClient (Ollama | OpenAI | Anthropic)
//!                  ↓
//!            OutputWriter (JSON artifacts + per-chunk cache)
//! ```
//!
//! Malformed model output is recovered ([`json::extract_json`]), retried, and
//! finally replaced by a per-phase fallback. Transport errors abort the run.
//!
//! ## Example
//!
//! ```ignore
//! use thesis_mining::{Config, OutputWriter, Pipeline, ThesisAnalyzer};
//! use thesis_mining::pipeline::load_chunks;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let chunks = load_chunks(&config.output.chunks_file())?;
//!     let analyzer = ThesisAnalyzer::from_config(&config)?;
//!     let writer = OutputWriter::new(&config.output)?;
//!     let book = Pipeline::new(analyzer, writer).run(&chunks).await?;
//!     println!("{} theses", book.theses.len());
//!     Ok(())
//! }
//! ```

/// Multi-phase thesis analysis over two model clients.
pub mod analyzer;
/// Configuration loaded from the environment.
pub mod config;
/// Error types and result aliases.
pub mod error;
/// JSON recovery from free-form model output.
pub mod json;
/// LLM client abstraction and provider implementations.
pub mod llm;
/// Domain entities, also the persisted JSON shapes.
pub mod models;
/// JSON artifact writer and per-chunk cache.
pub mod output;
/// End-to-end driver over pre-chunked text.
pub mod pipeline;
/// Prompt templates for each analysis phase.
pub mod prompts;
/// Scholarly references and footnotes from the book's notes.
pub mod scholarly;
/// Post-processing checks over theses, citations and chains.
pub mod validators;

pub use analyzer::ThesisAnalyzer;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{BookAnalysis, ChapterAnalysis, Chunk, Citation, Thesis, ThesisChain};
pub use output::OutputWriter;
pub use pipeline::Pipeline;
