//! Post-processing checks over extracted theses, citations and chains.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::{ChapterAnalysis, Citation, CitationType, Thesis, ThesisChain};

/// Theses under this confidence are counted as low confidence.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Supporting texts up to this length are too short to flag as duplicates.
const MIN_DUPLICATE_TEXT_CHARS: usize = 30;

fn biblical_ref_regex() -> &'static Regex {
    static BIBLICAL: OnceLock<Regex> = OnceLock::new();
    BIBLICAL.get_or_init(|| {
        Regex::new(r"^[1-3]?\s?[A-Za-zÀ-ú]{1,5}\s+\d+[.:]\d+(?:\s*[-–]\s*\d+)?$")
            .expect("biblical reference pattern is valid")
    })
}

/// Whether a reference looks like `Jo 3:16`, `1Co 2:2` or `Gn 1:1-3`.
pub fn is_biblical_reference(reference: &str) -> bool {
    biblical_ref_regex().is_match(reference)
}

/// Drop citations with blank references and reclassify verse-shaped ones as biblical.
pub fn validate_citations(citations: Vec<Citation>) -> Vec<Citation> {
    let mut removed = 0usize;
    let mut reclassified = 0usize;

    let valid: Vec<Citation> = citations
        .into_iter()
        .filter_map(|mut citation| {
            let reference = citation.reference.trim();
            if reference.is_empty() {
                removed += 1;
                return None;
            }
            if citation.citation_type != CitationType::Biblical && is_biblical_reference(reference)
            {
                citation.citation_type = CitationType::Biblical;
                reclassified += 1;
            }
            Some(citation)
        })
        .collect();

    if removed > 0 {
        info!(removed, "Removed citations with empty reference");
    }
    if reclassified > 0 {
        info!(reclassified, "Reclassified citations as biblical");
    }
    valid
}

/// Reclassify citations whose reference is a bare note number as footnotes.
///
/// Scholarly citations keep their type.
pub fn detect_footnotes(citations: Vec<Citation>) -> Vec<Citation> {
    let mut reclassified = 0usize;
    let citations = citations
        .into_iter()
        .map(|mut citation| {
            let reference = citation.reference.trim().trim_end_matches('.');
            let bare_number =
                !reference.is_empty() && reference.chars().all(|c| c.is_ascii_digit());
            if bare_number
                && !matches!(
                    citation.citation_type,
                    CitationType::Scholarly | CitationType::Footnote
                )
            {
                citation.citation_type = CitationType::Footnote;
                reclassified += 1;
            }
            citation
        })
        .collect();

    if reclassified > 0 {
        info!(reclassified, "Reclassified numeric references as footnotes");
    }
    citations
}

/// Validate embedded citations and log repeated supporting text per chapter.
///
/// Duplicates are reported, never removed.
pub fn validate_theses(theses: Vec<Thesis>) -> Vec<Thesis> {
    let mut seen: HashMap<String, HashSet<String>> = HashMap::new();
    let mut duplicates = 0usize;

    let theses: Vec<Thesis> = theses
        .into_iter()
        .map(|mut thesis| {
            if !thesis.citations.is_empty() {
                thesis.citations = validate_citations(std::mem::take(&mut thesis.citations));
            }

            let text = thesis.supporting_text.as_deref().unwrap_or_default().trim();
            if text.chars().count() > MIN_DUPLICATE_TEXT_CHARS {
                let chapter = if thesis.chapter.is_empty() {
                    "unknown"
                } else {
                    thesis.chapter.as_str()
                };
                if !seen
                    .entry(chapter.to_string())
                    .or_default()
                    .insert(text.to_string())
                {
                    duplicates += 1;
                    warn!(
                        chapter = %chapter,
                        thesis_id = %thesis.id,
                        supporting_text = %text.chars().take(60).collect::<String>(),
                        "Duplicate supporting text in chapter"
                    );
                }
            }
            thesis
        })
        .collect();

    if duplicates > 0 {
        info!(duplicates, "Theses with duplicate supporting text found");
    }
    theses
}

/// Summary counters over the per-chunk analyses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_theses: usize,
    /// Chunk-level citations only.
    pub total_citations: usize,
    /// Blank references among chunk-level and thesis-level citations.
    pub empty_references: usize,
    pub low_confidence_theses: usize,
    /// Counts per citation type, chunk-level and thesis-level combined.
    pub citation_types: BTreeMap<String, usize>,
}

impl QualityReport {
    fn count_citation(&mut self, citation: &Citation) {
        *self
            .citation_types
            .entry(citation.citation_type.as_str().to_string())
            .or_default() += 1;
        if citation.reference.trim().is_empty() {
            self.empty_references += 1;
        }
    }
}

/// Compute and log the quality report.
pub fn quality_report(analyses: &[ChapterAnalysis]) -> QualityReport {
    let mut report = QualityReport::default();

    for analysis in analyses {
        report.total_theses += analysis.theses.len();
        report.total_citations += analysis.citations.len();

        for thesis in &analysis.theses {
            if thesis.confidence < LOW_CONFIDENCE_THRESHOLD {
                report.low_confidence_theses += 1;
            }
            for citation in &thesis.citations {
                report.count_citation(citation);
            }
        }
        for citation in &analysis.citations {
            report.count_citation(citation);
        }
    }

    info!(
        total_theses = report.total_theses,
        total_citations = report.total_citations,
        empty_references = report.empty_references,
        low_confidence_theses = report.low_confidence_theses,
        citation_types = ?report.citation_types,
        "Quality report"
    );
    report
}

/// Split `T1.2.3` into (`T1.2`, 3).
fn split_thesis_id(id: &str) -> Option<(&str, u32)> {
    let (prefix, seq) = id.rsplit_once('.')?;
    Some((prefix, seq.parse().ok()?))
}

/// Renumber theses of later chunks that reuse an already claimed ID prefix.
///
/// Sub-chunks of one oversized chapter share `(part, chapter)` indices and
/// would each restart at `.1`. The first chunk using a prefix keeps its IDs;
/// later ones continue its sequence. Returns how many theses were renamed.
pub fn disambiguate_thesis_ids(analyses: &mut [ChapterAnalysis]) -> usize {
    let mut owner: HashMap<String, usize> = HashMap::new();
    let mut last_seq: HashMap<String, u32> = HashMap::new();
    let mut renamed = 0usize;

    for (index, analysis) in analyses.iter_mut().enumerate() {
        for thesis in &mut analysis.theses {
            let Some((prefix, seq)) = split_thesis_id(&thesis.id) else {
                continue;
            };
            let prefix = prefix.to_string();
            let first = *owner.entry(prefix.clone()).or_insert(index);
            let last = last_seq.entry(prefix.clone()).or_insert(0);

            if first == index {
                *last = (*last).max(seq);
                continue;
            }

            *last += 1;
            let new_id = format!("{}.{}", prefix, *last);
            warn!(
                chunk = %analysis.chunk_title,
                old_id = %thesis.id,
                new_id = %new_id,
                "Thesis ID collides with an earlier chunk, renumbering"
            );
            thesis.id = new_id;
            renamed += 1;
        }
    }
    renamed
}

/// Drop chains whose endpoints are not among the final theses.
pub fn prune_dangling_chains(chains: Vec<ThesisChain>, theses: &[Thesis]) -> Vec<ThesisChain> {
    let known: HashSet<&str> = theses.iter().map(|t| t.id.as_str()).collect();
    let before = chains.len();

    let kept: Vec<ThesisChain> = chains
        .into_iter()
        .filter(|c| {
            known.contains(c.from_thesis_id.as_str()) && known.contains(c.to_thesis_id.as_str())
        })
        .collect();

    let dropped = before - kept.len();
    if dropped > 0 {
        warn!(dropped, kept = kept.len(), "Dropped chains referencing theses removed by synthesis");
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReasoningType, Relationship, ThesisType};
    use pretty_assertions::assert_eq;

    fn citation(reference: &str, citation_type: CitationType) -> Citation {
        Citation::new(reference, citation_type).with_text("amostra")
    }

    fn thesis(id: &str, chapter: &str, supporting_text: &str) -> Thesis {
        Thesis {
            id: id.to_string(),
            title: "Titulo".to_string(),
            description: "Descricao".to_string(),
            thesis_type: ThesisType::Supporting,
            chapter: chapter.to_string(),
            part: "Parte 1".to_string(),
            page_range: None,
            supporting_text: Some(supporting_text.to_string()),
            citations: Vec::new(),
            confidence: 0.9,
        }
    }

    fn chain(from: &str, to: &str) -> ThesisChain {
        ThesisChain {
            from_thesis_id: from.to_string(),
            to_thesis_id: to.to_string(),
            relationship: Relationship::Supports,
            reasoning_type: ReasoningType::Deductive,
            explanation: String::new(),
            strength: 0.7,
        }
    }

    const LONG_TEXT: &str = "Texto de apoio suficientemente longo para deteccao de duplicatas.";

    #[test]
    fn test_detect_footnotes() {
        let citations = detect_footnotes(vec![
            citation("5", CitationType::Biblical),
            citation(" 12. ", CitationType::Biblical),
            citation("42", CitationType::Scholarly),
            citation("Jo 3:16", CitationType::Biblical),
        ]);
        let types: Vec<CitationType> = citations.iter().map(|c| c.citation_type).collect();
        assert_eq!(
            types,
            vec![
                CitationType::Footnote,
                CitationType::Footnote,
                CitationType::Scholarly,
                CitationType::Biblical,
            ]
        );
    }

    #[test]
    fn test_biblical_reference_pattern() {
        for reference in ["Jo 3:16", "1Co 2:2", "Gn 1:1-3", "1 Pe 1.18–19", "Êx 20:3"] {
            assert!(is_biblical_reference(reference), "{}", reference);
        }
        for reference in ["C.S. Lewis", "Joao", "Rm 5", "Apocalipse 3:20"] {
            assert!(!is_biblical_reference(reference), "{}", reference);
        }
    }

    #[test]
    fn test_validate_citations_removes_blank_references() {
        let result = validate_citations(vec![
            citation("", CitationType::Biblical),
            citation("   ", CitationType::Footnote),
            citation("Jo 3:16", CitationType::Biblical),
        ]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].reference, "Jo 3:16");
    }

    #[test]
    fn test_validate_citations_reclassifies_verses() {
        let result = validate_citations(vec![
            citation("Rm 3:23", CitationType::Scholarly),
            citation("C.S. Lewis", CitationType::Scholarly),
        ]);
        assert_eq!(result[0].citation_type, CitationType::Biblical);
        assert_eq!(result[1].citation_type, CitationType::Scholarly);
    }

    #[test]
    fn test_validate_theses_cleans_embedded_citations() {
        let mut t = thesis("T1.1.1", "Cap 1", LONG_TEXT);
        t.citations = vec![
            citation("", CitationType::Biblical),
            citation("1Co 15:3-4", CitationType::Footnote),
        ];
        let result = validate_theses(vec![t]);
        assert_eq!(result[0].citations.len(), 1);
        assert_eq!(result[0].citations[0].citation_type, CitationType::Biblical);
    }

    #[test]
    fn test_validate_theses_keeps_duplicates() {
        let theses = vec![
            thesis("T1.1.1", "Cap 1", LONG_TEXT),
            thesis("T1.1.2", "Cap 1", LONG_TEXT),
            thesis("T1.2.1", "Cap 2", LONG_TEXT),
        ];
        let result = validate_theses(theses.clone());
        assert_eq!(result, theses);
    }

    #[test]
    fn test_quality_report_counts() {
        let mut low = thesis("T1.1.2", "Cap 1", "curto");
        low.confidence = 0.5;
        low.citations = vec![citation("", CitationType::Footnote)];
        let analyses = vec![ChapterAnalysis {
            chunk_title: "Cap 1".to_string(),
            theses: vec![thesis("T1.1.1", "Cap 1", "curto"), low],
            citations: vec![
                citation("Jo 3:16", CitationType::Biblical),
                citation("Forsyth", CitationType::Scholarly),
            ],
        }];

        let report = quality_report(&analyses);
        assert_eq!(report.total_theses, 2);
        assert_eq!(report.total_citations, 2);
        assert_eq!(report.empty_references, 1);
        assert_eq!(report.low_confidence_theses, 1);
        assert_eq!(report.citation_types.get("biblical"), Some(&1));
        assert_eq!(report.citation_types.get("scholarly"), Some(&1));
        assert_eq!(report.citation_types.get("footnote"), Some(&1));
    }

    #[test]
    fn test_disambiguate_renumbers_repeated_prefix() {
        let mut analyses = vec![
            ChapterAnalysis {
                chunk_title: "Cap 3 (1/2)".to_string(),
                theses: vec![thesis("T1.3.1", "Cap 3", "a"), thesis("T1.3.2", "Cap 3", "b")],
                citations: Vec::new(),
            },
            ChapterAnalysis {
                chunk_title: "Cap 4".to_string(),
                theses: vec![thesis("T1.4.1", "Cap 4", "c")],
                citations: Vec::new(),
            },
            ChapterAnalysis {
                chunk_title: "Cap 3 (2/2)".to_string(),
                theses: vec![thesis("T1.3.1", "Cap 3", "d"), thesis("T1.3.2", "Cap 3", "e")],
                citations: Vec::new(),
            },
        ];

        let renamed = disambiguate_thesis_ids(&mut analyses);

        let ids: Vec<&str> = analyses
            .iter()
            .flat_map(|a| a.theses.iter().map(|t| t.id.as_str()))
            .collect();
        assert_eq!(ids, vec!["T1.3.1", "T1.3.2", "T1.4.1", "T1.3.3", "T1.3.4"]);
        assert_eq!(renamed, 2);
    }

    #[test]
    fn test_disambiguate_leaves_unique_ids_alone() {
        let mut analyses = vec![
            ChapterAnalysis {
                chunk_title: "Cap 1".to_string(),
                theses: vec![thesis("T1.1.1", "Cap 1", "a")],
                citations: Vec::new(),
            },
            ChapterAnalysis {
                chunk_title: "Cap 2".to_string(),
                theses: vec![thesis("T1.2.1", "Cap 2", "b")],
                citations: Vec::new(),
            },
        ];
        let before = analyses.clone();
        assert_eq!(disambiguate_thesis_ids(&mut analyses), 0);
        assert_eq!(analyses, before);
    }

    #[test]
    fn test_prune_dangling_chains() {
        let theses = vec![thesis("T1.1.1", "Cap 1", "a"), thesis("T2.5.1", "Cap 5", "b")];
        let chains = vec![
            chain("T1.1.1", "T2.5.1"),
            chain("T1.1.1", "T1.1.2"),
            chain("T3.7.1", "T2.5.1"),
        ];

        let kept = prune_dangling_chains(chains, &theses);
        assert_eq!(kept, vec![chain("T1.1.1", "T2.5.1")]);
    }
}
