//! Expected response shapes per phase and their conversion to domain types.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ParseError, ParseResult};
use crate::models::{
    deserialize_score, Chunk, Citation, CitationCorrelation, Thesis, ThesisChain, ThesisType,
};

fn default_thesis_type() -> ThesisType {
    ThesisType::Supporting
}

fn default_confidence() -> f64 {
    0.8
}

fn check_unit_range(field: &str, value: f64) -> ParseResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ParseError::invalid(field, format!("{} is outside [0, 1]", value)))
    }
}

fn require_key(value: &Value, key: &str) -> ParseResult<()> {
    if value.get(key).is_some() {
        Ok(())
    } else {
        Err(ParseError::missing(key))
    }
}

/// Thesis as returned by the extraction model; its `id` is ignored.
#[derive(Debug, Deserialize)]
struct ExtractedThesis {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_thesis_type")]
    thesis_type: ThesisType,
    #[serde(default)]
    supporting_text: Option<String>,
    #[serde(default)]
    citations: Vec<Citation>,
    #[serde(default = "default_confidence", deserialize_with = "deserialize_score")]
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct ExtractionResponse {
    #[serde(default)]
    theses: Vec<ExtractedThesis>,
    #[serde(default)]
    citations: Vec<Citation>,
}

/// Parse phase 3a output, assigning hierarchical IDs from the chunk indices.
pub(crate) fn parse_extraction(
    value: Value,
    chunk: &Chunk,
) -> ParseResult<(Vec<Thesis>, Vec<Citation>)> {
    let response: ExtractionResponse = serde_json::from_value(value)?;
    let prefix = chunk.thesis_id_prefix();

    let theses = response
        .theses
        .into_iter()
        .enumerate()
        .map(|(i, t)| {
            check_unit_range("confidence", t.confidence)?;
            Ok(Thesis {
                id: format!("{}.{}", prefix, i + 1),
                title: t.title,
                description: t.description,
                thesis_type: t.thesis_type,
                chapter: chunk.chapter_label().to_string(),
                part: chunk.part.clone(),
                page_range: chunk.page_range.clone(),
                supporting_text: t.supporting_text,
                citations: t.citations,
                confidence: t.confidence,
            })
        })
        .collect::<ParseResult<Vec<_>>>()?;

    Ok((theses, response.citations))
}

#[derive(Debug, Deserialize)]
struct ChainResponse {
    #[serde(default)]
    chains: Vec<ThesisChain>,
    #[serde(default)]
    argument_flow: String,
}

/// Parse phase 3b output into chains and the argument-flow narrative.
pub(crate) fn parse_chains(value: Value) -> ParseResult<(Vec<ThesisChain>, String)> {
    let response: ChainResponse = serde_json::from_value(value)?;
    for chain in &response.chains {
        check_unit_range("strength", chain.strength)?;
    }
    Ok((response.chains, response.argument_flow))
}

/// Parse phase 3c output; both known keys must be arrays when present.
pub(crate) fn parse_correlation(value: Value) -> ParseResult<CitationCorrelation> {
    let Value::Object(mut map) = value else {
        return Err(ParseError::invalid("correlation", "expected a JSON object"));
    };

    for key in [
        CitationCorrelation::GROUPED_CITATIONS,
        CitationCorrelation::CROSS_REFERENCES,
    ] {
        match map.get(key) {
            None | Some(Value::Null) => {
                map.insert(key.to_string(), Value::Array(Vec::new()));
            }
            Some(Value::Array(_)) => {}
            Some(_) => return Err(ParseError::invalid(key, "expected an array")),
        }
    }

    Ok(CitationCorrelation(map))
}

#[derive(Debug, Deserialize)]
struct DuplicateEntry {
    remove_id: String,
}

#[derive(Debug, Deserialize)]
struct DedupResponse {
    #[serde(default)]
    duplicates: Vec<DuplicateEntry>,
}

/// Parse phase 3d-i output into the IDs flagged for removal.
pub(crate) fn parse_dedup(value: Value) -> ParseResult<Vec<String>> {
    require_key(&value, "duplicates")?;
    let response: DedupResponse = serde_json::from_value(value)?;
    Ok(response
        .duplicates
        .into_iter()
        .map(|d| d.remove_id)
        .collect())
}

#[derive(Debug, Deserialize)]
struct SelectedThesis {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SynthesisResponse {
    theses: Vec<SelectedThesis>,
    #[serde(default)]
    summary: String,
}

/// Parse phase 3d-ii output into the selected IDs (in model order) and summary.
pub(crate) fn parse_synthesis(value: Value) -> ParseResult<(Vec<String>, String)> {
    require_key(&value, "theses")?;
    let response: SynthesisResponse = serde_json::from_value(value)?;
    Ok((
        response.theses.into_iter().map(|t| t.id).collect(),
        response.summary,
    ))
}
