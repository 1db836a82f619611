//! Multi-phase thesis analysis.
//!
//! [`ThesisAnalyzer`] drives four sequential phases against two model
//! clients:
//!
//! - **3a** [`ThesisAnalyzer::analyze_chunk`]: theses + citations per chunk (extraction client)
//! - **3b** [`ThesisAnalyzer::extract_chains`]: logical chains between theses
//! - **3c** [`ThesisAnalyzer::correlate_citations`]: thematic citation grouping
//! - **3d** [`ThesisAnalyzer::synthesize`]: per-part dedup, then global selection
//!
//! Phases 3b-3d use the reasoning client, whose output is stripped of
//! `<think>` blocks. Every phase retries malformed output and degrades to a
//! fallback; transport errors are returned to the caller untouched.

mod responses;
mod retry;


use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{LlmResult, ParseError, ParseResult};
use crate::llm::{create_client, LlmClient, Provider};
use crate::models::{ChapterAnalysis, Chunk, Citation, CitationCorrelation, Thesis, ThesisChain};
use crate::prompts::{
    chain_extraction_prompt, citation_correlation_prompt, dedup_prompt, synthesis_prompt,
    thesis_extraction_prompt, truncate_chars, CHAIN_SUPPORTING_TEXT_CHARS, MAX_CHUNK_CHARS,
    SYSTEM_PROMPT,
};
use retry::StructuredCall;

/// Bucket for theses whose chunk belongs to no part.
pub const NO_PART: &str = "Sem parte";

/// Orchestrates the analysis phases over an extraction and a reasoning client.
#[derive(Clone)]
pub struct ThesisAnalyzer {
    extraction: Arc<dyn LlmClient>,
    reasoning: Arc<dyn LlmClient>,
    max_retries: u32,
}

impl ThesisAnalyzer {
    /// Create an analyzer from explicit clients. `max_retries` is at least 1.
    pub fn new(
        extraction: Arc<dyn LlmClient>,
        reasoning: Arc<dyn LlmClient>,
        max_retries: u32,
    ) -> Self {
        Self {
            extraction,
            reasoning,
            max_retries: max_retries.max(1),
        }
    }

    /// Build both clients from configuration.
    ///
    /// The reasoning client only gets its own model on the local backend.
    pub fn from_config(config: &Config) -> LlmResult<Self> {
        let extraction = create_client(config, None)?;
        let reasoning = create_client(config, config.llm.reasoning_model_override())?;

        info!(
            provider = %config.llm.provider,
            extraction_model = %extraction.model_name(),
            reasoning_model = %reasoning.model_name(),
            "Thesis analyzer initialized"
        );

        Ok(Self::new(extraction, reasoning, config.llm.max_retries))
    }

    /// Backend both clients talk to.
    pub fn provider(&self) -> Provider {
        self.extraction.provider()
    }

    /// Model used for phase 3a.
    pub fn extraction_model(&self) -> &str {
        self.extraction.model_name()
    }

    /// Model used for phases 3b-3d.
    pub fn reasoning_model(&self) -> &str {
        self.reasoning.model_name()
    }

    /// Attempts per phase before falling back.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn extraction_call<'a>(&'a self, phase: &'a str) -> StructuredCall<'a> {
        StructuredCall {
            phase,
            client: self.extraction.as_ref(),
            strip_thinking: false,
            max_attempts: self.max_retries,
        }
    }

    fn reasoning_call<'a>(&'a self, phase: &'a str) -> StructuredCall<'a> {
        StructuredCall {
            phase,
            client: self.reasoning.as_ref(),
            strip_thinking: true,
            max_attempts: self.max_retries,
        }
    }

    /// Phase 3a: extract theses and citations from one chunk.
    ///
    /// Theses get IDs `T<part_index>.<chapter_index>.<n>` (absent indices are
    /// 0, `n` is the 1-based position); model-supplied IDs are discarded.
    /// Falls back to an empty analysis when every attempt is malformed.
    pub async fn analyze_chunk(&self, chunk: &Chunk) -> LlmResult<ChapterAnalysis> {
        let prompt = thesis_extraction_prompt(
            chunk.part_label(),
            chunk.chapter_label(),
            &chunk.title,
            truncate_chars(&chunk.text, MAX_CHUNK_CHARS),
        );

        let analysis = self
            .extraction_call("thesis_extraction")
            .run(
                SYSTEM_PROMPT,
                &prompt,
                |value| {
                    let (theses, citations) = responses::parse_extraction(value, chunk)?;
                    Ok(ChapterAnalysis {
                        chunk_title: chunk.title.clone(),
                        theses,
                        citations,
                    })
                },
                || ChapterAnalysis::empty(&chunk.title),
            )
            .await?;

        info!(
            chunk = %chunk.title,
            theses = analysis.theses.len(),
            citations = analysis.citations.len(),
            "Chunk analyzed"
        );
        Ok(analysis)
    }

    /// Phase 3b: find logical relationships between theses.
    ///
    /// Returns the chains and a narrative of the overall argument flow;
    /// `([], "")` when every attempt is malformed.
    pub async fn extract_chains(&self, theses: &[Thesis]) -> LlmResult<(Vec<ThesisChain>, String)> {
        let projection: Vec<Value> = theses
            .iter()
            .map(|t| {
                json!({
                    "id": t.id,
                    "title": t.title,
                    "description": t.description,
                    "type": t.thesis_type,
                    "chapter": t.chapter,
                    "part": t.part,
                    "supporting_text": truncate_chars(
                        t.supporting_text.as_deref().unwrap_or_default(),
                        CHAIN_SUPPORTING_TEXT_CHARS,
                    ),
                })
            })
            .collect();
        let prompt = chain_extraction_prompt(&to_pretty_json(&projection));
        debug!(theses = theses.len(), prompt_chars = prompt.len(), "Chain prompt built");

        let (chains, argument_flow) = self
            .reasoning_call("chain_extraction")
            .run(SYSTEM_PROMPT, &prompt, responses::parse_chains, || {
                (Vec::new(), String::new())
            })
            .await?;

        info!(chains = chains.len(), "Chains extracted");
        Ok((chains, argument_flow))
    }

    /// Phase 3c: group citations by theological theme and cross-reference them.
    ///
    /// Only theses that carry citations are sent as context.
    pub async fn correlate_citations(
        &self,
        citations: &[Citation],
        theses: &[Thesis],
    ) -> LlmResult<CitationCorrelation> {
        let theses_context: Vec<Value> = theses
            .iter()
            .filter(|t| !t.citations.is_empty())
            .map(|t| {
                json!({
                    "id": t.id,
                    "title": t.title,
                    "part": t.part,
                    "chapter": t.chapter,
                    "citation_refs": t
                        .citations
                        .iter()
                        .map(|c| c.reference.as_str())
                        .collect::<Vec<_>>(),
                })
            })
            .collect();

        let prompt = citation_correlation_prompt(
            &to_pretty_json(&citations),
            &to_pretty_json(&theses_context),
        );

        let correlation = self
            .reasoning_call("citation_correlation")
            .run(
                SYSTEM_PROMPT,
                &prompt,
                responses::parse_correlation,
                CitationCorrelation::empty,
            )
            .await?;

        info!(
            groups = correlation.grouped_citations().len(),
            cross_references = correlation.cross_references().len(),
            "Citations correlated"
        );
        Ok(correlation)
    }

    /// Phase 3d: deduplicate each part, then select the final thesis set.
    ///
    /// The model only chooses IDs; returned theses are the untouched
    /// originals. Unknown IDs are dropped with a warning. When every attempt
    /// is malformed the deduplicated set is returned with an empty summary.
    pub async fn synthesize(
        &self,
        analyses: &[ChapterAnalysis],
    ) -> LlmResult<(Vec<Thesis>, String)> {
        let by_part = group_by_part(analyses.iter().flat_map(|a| a.theses.iter().cloned()));

        let mut deduped = Vec::new();
        for (part_name, part_theses) in by_part {
            info!(part = %part_name, theses = part_theses.len(), "Deduplicating part");
            let kept = self.dedup_part(&part_name, part_theses).await?;
            info!(part = %part_name, theses = kept.len(), "Part deduplicated");
            deduped.extend(kept);
        }
        info!(theses = deduped.len(), "Per-part deduplication complete");

        let mut parts = Map::new();
        for (part_name, part_theses) in group_by_part(deduped.iter().cloned()) {
            parts.insert(part_name, serde_json::to_value(part_theses).unwrap_or_default());
        }
        let prompt = synthesis_prompt(&to_pretty_json(&parts));

        let selection = self
            .reasoning_call("synthesis")
            .run(
                SYSTEM_PROMPT,
                &prompt,
                |value| {
                    let (ids, summary) = responses::parse_synthesis(value)?;
                    Ok((select_by_id(&deduped, &ids)?, summary))
                },
                || (deduped.clone(), String::new()),
            )
            .await?;

        info!(theses = selection.0.len(), "Synthesis complete");
        Ok(selection)
    }

    /// Phase 3d-i: drop near-duplicate theses within one part.
    ///
    /// Only `{id, title}` pairs are sent; the filtering happens here so every
    /// surviving thesis is returned unchanged. Fails open: malformed output
    /// on every attempt returns the input as-is.
    pub async fn dedup_part(&self, part_name: &str, theses: Vec<Thesis>) -> LlmResult<Vec<Thesis>> {
        let compact: Vec<Value> = theses
            .iter()
            .map(|t| json!({"id": t.id, "title": t.title}))
            .collect();
        let prompt = dedup_prompt(part_name, theses.len(), &to_pretty_json(&compact));

        let remove_ids = self
            .reasoning_call("dedup")
            .run(SYSTEM_PROMPT, &prompt, responses::parse_dedup, Vec::new)
            .await?;

        if remove_ids.is_empty() {
            return Ok(theses);
        }

        let remove: HashSet<String> = remove_ids.into_iter().collect();
        info!(part = %part_name, remove = ?remove, "Removing duplicate theses");
        Ok(theses
            .into_iter()
            .filter(|t| !remove.contains(&t.id))
            .collect())
    }
}

/// Group theses by part label in first-seen order; empty parts go to [`NO_PART`].
pub fn group_by_part(theses: impl IntoIterator<Item = Thesis>) -> Vec<(String, Vec<Thesis>)> {
    let mut groups: Vec<(String, Vec<Thesis>)> = Vec::new();
    for thesis in theses {
        let key = if thesis.part.is_empty() {
            NO_PART.to_string()
        } else {
            thesis.part.clone()
        };
        match groups.iter_mut().find(|(part, _)| *part == key) {
            Some((_, bucket)) => bucket.push(thesis),
            None => groups.push((key, vec![thesis])),
        }
    }
    groups
}

/// Map selected IDs back to the original theses, in selection order.
fn select_by_id(pool: &[Thesis], ids: &[String]) -> ParseResult<Vec<Thesis>> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();

    for id in ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        match pool.iter().find(|t| &t.id == id) {
            Some(thesis) => selected.push(thesis.clone()),
            None => warn!(id = %id, "Synthesis returned an unknown thesis ID, dropping it"),
        }
    }

    if selected.is_empty() && !pool.is_empty() {
        return Err(ParseError::invalid(
            "theses",
            "no known thesis IDs selected",
        ));
    }
    Ok(selected)
}

fn to_pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}
