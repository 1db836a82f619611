//! Scholarly references and footnotes of "Cristianismo Basico".
//!
//! Three sources feed phase 3a+:
//!
//! - the formal references listed in the book's notes section (fixed table)
//! - scholars mentioned inline in the body chapters (fixed table)
//! - the notes chunk itself, when present in the chunks directory: formal
//!   references not already in the table, plus numbered biblical footnotes
//!   under each `## CAPITULO N` heading

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::models::{Citation, CitationType};

/// Notes chunk written by the chunker into the chunks directory.
pub const NOTES_FILE: &str = "chunk_29_notas.md";

struct NotesReference {
    chapter: u32,
    author: &'static str,
    work: Option<&'static str>,
    publisher: Option<&'static str>,
    year: Option<u16>,
    context: &'static str,
}

struct InlineMention {
    chapter: u32,
    author: &'static str,
    work: Option<&'static str>,
    context: &'static str,
}

const NOTES_REFERENCES: &[NotesReference] = &[
    NotesReference {
        chapter: 2,
        author: "FORSYTH, P.T.",
        work: Some("This Life and the Next"),
        publisher: Some("Independent Press"),
        year: Some(1947),
        context: "Citado por Stott como referencia sobre vida apos a morte",
    },
    NotesReference {
        chapter: 2,
        author: "LEWIS, C.S.",
        work: Some("Miracles"),
        publisher: Some("Bles"),
        year: Some(1947),
        context: "Referencia sobre milagres e a intervencao divina no mundo natural",
    },
    NotesReference {
        chapter: 3,
        author: "THOMAS, W.H. Griffith",
        work: Some("Christianity is Christ"),
        publisher: Some("Church Book Room Press"),
        year: Some(1909),
        context: "Citado para demonstrar que o carater de Cristo e o centro do cristianismo",
    },
    NotesReference {
        chapter: 3,
        author: "SIMPSON, P. Carnegie",
        work: Some("The Fact of Christ"),
        publisher: Some("James Clarke"),
        year: Some(1930),
        context: "Referencia sobre a singularidade do carater de Cristo como fato historico",
    },
    NotesReference {
        chapter: 3,
        author: "DENNEY, James",
        work: Some("Studies in Theology"),
        publisher: Some("Hodder e Stoughton"),
        year: Some(1906),
        context: "Citado como referencia teologica sobre a relacao entre teologia e a pessoa de Cristo",
    },
    NotesReference {
        chapter: 4,
        author: "ORR, James",
        work: Some("The Virgin Birth of Christ"),
        publisher: Some("Hodder e Stoughton"),
        year: Some(1907),
        context: "Referencia sobre a questao do nascimento virginal de Jesus",
    },
    NotesReference {
        chapter: 4,
        author: "MACHEN, J. Gresham",
        work: Some("The Virgin Birth"),
        publisher: Some("Marshall, Morgan e Scott"),
        year: Some(1936),
        context: "Referencia sobre a defesa historica e teologica do nascimento virginal",
    },
    NotesReference {
        chapter: 4,
        author: "LATHAM, Henry",
        work: Some("The Risen Master"),
        publisher: Some("Leighton Bell"),
        year: Some(1904),
        context: "Referencia sobre as evidencias da ressurreicao de Cristo",
    },
    NotesReference {
        chapter: 6,
        author: "Studdert Kennedy",
        work: None,
        publisher: None,
        year: None,
        context: "Citado no contexto das consequencias do pecado",
    },
    NotesReference {
        chapter: 6,
        author: "Archbishop Temple",
        work: Some("Christianity and Social Order"),
        publisher: Some("SCM Press"),
        year: Some(1942),
        context: "Referencia sobre a relacao entre cristianismo e ordem social",
    },
];

const INLINE_MENTIONS: &[InlineMention] = &[
    InlineMention {
        chapter: 2,
        author: "Emerson",
        work: None,
        context: "Mencionado no contexto das afirmacoes de Cristo sobre si mesmo",
    },
    InlineMention {
        chapter: 3,
        author: "John Stuart Mill",
        work: None,
        context: "Citado sobre o carater unico de Cristo",
    },
    InlineMention {
        chapter: 3,
        author: "Carnegie Simpson",
        work: Some("The Fact of Christ"),
        context: "Citado como testemunho do impacto do carater de Cristo",
    },
    InlineMention {
        chapter: 3,
        author: "Charles Lamb",
        work: None,
        context: "Citado sobre a reverencia que o carater de Cristo inspira",
    },
    InlineMention {
        chapter: 4,
        author: "Thomas Arnold",
        work: None,
        context: "Citado como historiador que afirmou a historicidade da ressurreicao",
    },
    InlineMention {
        chapter: 4,
        author: "Sir Edward Clarke",
        work: None,
        context: "Citado como jurista que avaliou as evidencias da ressurreicao",
    },
    InlineMention {
        chapter: 10,
        author: "C.S. Lewis",
        work: None,
        context: "Citado no contexto de tomar uma decisao por Cristo",
    },
];

/// `SURNAME, Initials. Title. Publisher, Year`
fn formal_reference_regex() -> &'static Regex {
    static FORMAL: OnceLock<Regex> = OnceLock::new();
    FORMAL.get_or_init(|| {
        Regex::new(r"([A-ZÀ-Ú][A-ZÀ-Ú]+),\s+([A-ZÀ-Ú][\w.\s]*?)\.\s+(.+?)\.\s+(.+?,\s*\d{4})")
            .expect("formal reference pattern is valid")
    })
}

/// Numbered note whose body starts with one or more verse references.
fn footnote_regex() -> &'static Regex {
    static FOOTNOTE: OnceLock<Regex> = OnceLock::new();
    FOOTNOTE.get_or_init(|| {
        Regex::new(r"^\s*-?\s*\d+\.?\s+((?:[1-3]?\s*[A-Za-zÀ-ú]+\s+\d+[.:]\d+[^.]*?\.?)+)")
            .expect("footnote pattern is valid")
    })
}

fn chapter_heading_regex() -> &'static Regex {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    HEADING.get_or_init(|| {
        Regex::new(r"(?i)^##\s*CAPITULO\s+(\d+)").expect("chapter heading pattern is valid")
    })
}

/// Key for author+work deduplication, insensitive to case and trailing periods.
fn work_key(author: &str, work: Option<&str>) -> String {
    format!(
        "{}|{}",
        author.trim().trim_end_matches('.').to_lowercase(),
        work.unwrap_or("(sem obra especifica)")
            .trim()
            .to_lowercase()
    )
}

/// Read the notes chunk from `chunks_dir`; `None` when absent or unreadable.
pub fn read_notes(chunks_dir: &Path) -> Option<String> {
    let path = chunks_dir.join(NOTES_FILE);
    match fs::read_to_string(&path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "Notes file not found");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Notes file unreadable");
            None
        }
    }
}

/// Scholarly citations from the fixed tables, plus formal references parsed from `notes`.
pub fn scholarly_citations(notes: Option<&str>) -> Vec<Citation> {
    let mut citations = Vec::new();
    let mut seen = HashSet::new();

    for known in NOTES_REFERENCES {
        if !seen.insert(work_key(known.author, known.work)) {
            continue;
        }
        let year = known.year.map(|y| y.to_string());
        let reference = [Some(known.author), known.work, known.publisher, year.as_deref()]
            .into_iter()
            .flatten()
            .map(|part| part.trim_end_matches('.'))
            .collect::<Vec<_>>()
            .join(". ");

        citations.push(Citation {
            author: Some(known.author.to_string()),
            work: known.work.map(str::to_string),
            context: Some(known.context.to_string()),
            ..Citation::new(reference, CitationType::Scholarly)
                .with_text(format!("Cap. {}: {}", known.chapter, known.context))
        });
    }

    let mut inline_seen = HashSet::new();
    for mention in INLINE_MENTIONS {
        if !inline_seen.insert(work_key(mention.author, mention.work)) {
            continue;
        }
        citations.push(Citation {
            author: Some(mention.author.to_string()),
            work: mention.work.map(str::to_string),
            context: Some(mention.context.to_string()),
            ..Citation::new(mention.author, CitationType::Scholarly)
                .with_text(format!("Cap. {}: {}", mention.chapter, mention.context))
        });
    }

    let mut parsed = 0usize;
    if let Some(notes) = notes {
        for caps in formal_reference_regex().captures_iter(notes) {
            let author = format!("{}, {}", caps[1].trim(), caps[2].trim());
            let work = caps[3].trim().to_string();
            if !seen.insert(work_key(&author, Some(work.as_str()))) {
                continue;
            }
            parsed += 1;
            citations.push(Citation {
                reference: format!("{}. {}. {}", author, work, caps[4].trim()),
                author: Some(author),
                work: Some(work),
                ..Citation::new(String::new(), CitationType::Scholarly)
            });
        }
    }

    info!(
        total = citations.len(),
        from_notes_table = NOTES_REFERENCES.len(),
        inline = INLINE_MENTIONS.len(),
        parsed_from_notes = parsed,
        "Scholarly citations collected"
    );
    citations
}

/// Numbered biblical footnotes from the notes chunk, labelled with their chapter.
///
/// Lines before the first `## CAPITULO N` heading and formal scholarly
/// references are skipped.
pub fn footnote_citations(notes: &str) -> Vec<Citation> {
    let mut citations = Vec::new();
    let mut chapter: Option<String> = None;

    for line in notes.lines() {
        if let Some(caps) = chapter_heading_regex().captures(line) {
            chapter = Some(format!("Cap. {}", &caps[1]));
            continue;
        }
        if formal_reference_regex().is_match(line) {
            continue;
        }
        let (Some(chapter), Some(caps)) = (chapter.as_deref(), footnote_regex().captures(line))
        else {
            continue;
        };

        let reference = caps[1].trim().trim_end_matches('.').trim_end();
        citations.push(Citation {
            context: Some(format!("Nota de rodape do {}", chapter)),
            ..Citation::new(reference, CitationType::Footnote)
                .with_text(format!("Nota de rodape ({})", chapter))
        });
    }

    info!(footnotes = citations.len(), "Footnotes extracted from notes");
    citations
}

/// Phase 3a+: scholarly citations followed by notes footnotes for `chunks_dir`.
pub fn supplementary_citations(chunks_dir: &Path) -> Vec<Citation> {
    let notes = read_notes(chunks_dir);
    let mut citations = scholarly_citations(notes.as_deref());
    if let Some(notes) = notes.as_deref() {
        citations.extend(footnote_citations(notes));
    }
    debug!(citations = citations.len(), "Supplementary citations ready");
    citations
}
