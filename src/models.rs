//! Domain model for argument mining.
//!
//! These types are also the persisted JSON shapes: `theses.json` is an array
//! of [`Thesis`], `chains.json` of [`ThesisChain`], `citations.json` of
//! [`Citation`].

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Kind of cited source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationType {
    /// Bible verse reference (e.g. "Jo 3:16").
    #[default]
    Biblical,
    /// Theologian or other author.
    Scholarly,
    /// Footnote marker.
    Footnote,
}

impl CitationType {
    /// Lowercase identifier as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationType::Biblical => "biblical",
            CitationType::Scholarly => "scholarly",
            CitationType::Footnote => "footnote",
        }
    }
}

/// A quoted or referenced external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Human-readable key, e.g. "Jo 3:16" or an author name.
    pub reference: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub citation_type: CitationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Citation {
    /// Create a citation with only a reference and type.
    pub fn new(reference: impl Into<String>, citation_type: CitationType) -> Self {
        Self {
            reference: reference.into(),
            text: None,
            page: None,
            citation_type,
            author: None,
            work: None,
            context: None,
        }
    }

    /// Set the quoted text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Role a thesis plays in the argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThesisType {
    Main,
    Supporting,
    Premise,
    Conclusion,
}

/// An extracted argumentative claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thesis {
    /// Hierarchical identifier `T<part>.<chapter>.<sequence>`.
    pub id: String,
    pub title: String,
    pub description: String,
    pub thesis_type: ThesisType,
    #[serde(default)]
    pub chapter: String,
    #[serde(default)]
    pub part: String,
    #[serde(default)]
    pub page_range: Option<String>,
    #[serde(default)]
    pub supporting_text: Option<String>,
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// Model confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Directed relationship between two theses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Supports,
    DerivesFrom,
    Elaborates,
    Precedes,
    Contradicts,
}

/// Inference style behind a chain (Peirce's taxonomy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningType {
    #[default]
    Deductive,
    Inductive,
    Abductive,
}

fn default_strength() -> f64 {
    0.7
}

/// Deserialize a score from either a JSON number or a numeric string (`"0.8"`).
pub(crate) fn deserialize_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom(format!("{} is not representable as f64", n))),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            de::Error::invalid_value(de::Unexpected::Str(&s), &"a number or numeric string")
        }),
        other => Err(de::Error::invalid_type(
            de::Unexpected::Other(&other.to_string()),
            &"a number or numeric string",
        )),
    }
}

/// Edge in the argument graph, keyed by thesis IDs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThesisChain {
    pub from_thesis_id: String,
    pub to_thesis_id: String,
    pub relationship: Relationship,
    #[serde(default)]
    pub reasoning_type: ReasoningType,
    #[serde(default)]
    pub explanation: String,
    /// Strength in `[0, 1]`.
    #[serde(default = "default_strength", deserialize_with = "deserialize_score")]
    pub strength: f64,
}

/// Structural unit of source text produced by the chunker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    /// e.g. "Capitulo 1 - O Argumento Cristao"
    pub title: String,
    #[serde(default)]
    pub part: String,
    #[serde(default)]
    pub chapter: String,
    /// 1 for "Parte 1"; seeds the thesis ID scheme.
    #[serde(default)]
    pub part_index: Option<u32>,
    #[serde(default)]
    pub chapter_index: Option<u32>,
    pub text: String,
    #[serde(default)]
    pub char_count: usize,
    #[serde(default)]
    pub page_range: Option<String>,
    /// "markdown_heading" or "regex_fallback"
    #[serde(default)]
    pub source: String,
}

impl Chunk {
    /// Part label, or `N/A` when the chunk sits outside any part.
    pub fn part_label(&self) -> &str {
        if self.part.is_empty() {
            "N/A"
        } else {
            &self.part
        }
    }

    /// Chapter label, falling back to the chunk title.
    pub fn chapter_label(&self) -> &str {
        if self.chapter.is_empty() {
            &self.title
        } else {
            &self.chapter
        }
    }

    /// ID prefix `T<part>.<chapter>`, absent indices counting as 0.
    pub fn thesis_id_prefix(&self) -> String {
        format!(
            "T{}.{}",
            self.part_index.unwrap_or(0),
            self.chapter_index.unwrap_or(0)
        )
    }
}

/// Per-chunk result of thesis extraction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChapterAnalysis {
    pub chunk_title: String,
    #[serde(default)]
    pub theses: Vec<Thesis>,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

impl ChapterAnalysis {
    /// Empty analysis, used when extraction gives up on a chunk.
    pub fn empty(chunk_title: impl Into<String>) -> Self {
        Self {
            chunk_title: chunk_title.into(),
            theses: Vec::new(),
            citations: Vec::new(),
        }
    }
}

/// Terminal aggregate handed to output writers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BookAnalysis {
    pub theses: Vec<Thesis>,
    pub chains: Vec<ThesisChain>,
    pub citations: Vec<Citation>,
    pub summary: String,
    pub argument_flow: String,
}

/// Free-form citation grouping from the correlation phase.
///
/// Kept as a loose JSON map: consumers only read `grouped_citations` and
/// `cross_references`, and the model may add keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CitationCorrelation(pub Map<String, Value>);

impl CitationCorrelation {
    pub const GROUPED_CITATIONS: &'static str = "grouped_citations";
    pub const CROSS_REFERENCES: &'static str = "cross_references";

    /// Both known keys present and empty.
    pub fn empty() -> Self {
        let mut map = Map::new();
        map.insert(Self::GROUPED_CITATIONS.to_string(), Value::Array(Vec::new()));
        map.insert(Self::CROSS_REFERENCES.to_string(), Value::Array(Vec::new()));
        Self(map)
    }

    /// Theme groups, empty when absent.
    pub fn grouped_citations(&self) -> &[Value] {
        self.array(Self::GROUPED_CITATIONS)
    }

    /// Citation cross-references, empty when absent.
    pub fn cross_references(&self) -> &[Value] {
        self.array(Self::CROSS_REFERENCES)
    }

    fn array(&self, key: &str) -> &[Value] {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
