//! Recovery of JSON payloads from free-form model output.
//!
//! Models wrap JSON in markdown fences, prepend prose, emit trailing commas or
//! stop mid-object. [`extract_json`] locates the payload and, when a strict
//! parse fails, runs the tolerant [`repair_json`] pass. The caller still owns
//! the authoritative parse.

mod repair;

pub use repair::repair_json;

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::ParseResult;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)\n?```").expect("fence pattern is valid")
    })
}

fn think_regex() -> &'static Regex {
    static THINK: OnceLock<Regex> = OnceLock::new();
    THINK.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("think pattern is valid"))
}

/// Extract a JSON payload from model output.
///
/// Candidate selection, in priority order:
/// 1. Inner content of the first fenced code block (optionally tagged `json`)
/// 2. The whole trimmed text when it starts with `{` or `[`
/// 3. The span from the first `{` to the last `}`
///
/// Text with no braces at all is returned unchanged. A candidate that fails a
/// strict parse is passed through [`repair_json`]; the repaired text is not
/// re-validated here.
pub fn extract_json(text: &str) -> String {
    let candidate = if let Some(caps) = fence_regex().captures(text) {
        caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default()
    } else {
        let trimmed = text.trim();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            trimmed
        } else {
            match (trimmed.find('{'), trimmed.rfind('}')) {
                (Some(start), Some(end)) if start < end => &trimmed[start..=end],
                _ => return text.to_string(),
            }
        }
    };

    if serde_json::from_str::<Value>(candidate).is_ok() {
        return candidate.to_string();
    }

    debug!(
        candidate_chars = candidate.len(),
        "Strict JSON parse failed, attempting repair"
    );
    repair_json(candidate)
}

/// Remove `<think>...</think>` spans emitted by reasoning models and trim.
pub fn strip_thinking_tags(text: &str) -> String {
    think_regex().replace_all(text, "").trim().to_string()
}

/// Recover and strictly parse a JSON value from model output.
pub fn parse_completion(text: &str) -> ParseResult<Value> {
    Ok(serde_json::from_str(&extract_json(text))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_fenced_json_block() {
        let text = "Aqui esta:\n```json\n{\"a\":1}\n```\nFim.";
        assert_eq!(extract_json(text), "{\"a\":1}");
    }

    #[test]
    fn test_extract_untagged_fence() {
        let text = "```\n[1, 2]\n```";
        assert_eq!(extract_json(text), "[1, 2]");
    }

    #[test]
    fn test_extract_raw_object_trimmed() {
        assert_eq!(extract_json("  {\"a\": 1}\n"), "{\"a\": 1}");
        assert_eq!(extract_json("[{\"a\": 1}]"), "[{\"a\": 1}]");
    }

    #[test]
    fn test_extract_embedded_object_with_trailing_comma() {
        let extracted = extract_json("Here: {\"a\": 1, \"b\": [1,2,3,]} done");
        let value: Value = serde_json::from_str(&extracted).unwrap();
        assert_eq!(value, json!({"a": 1, "b": [1, 2, 3]}));
    }

    #[test]
    fn test_extract_greedy_span_covers_nested_objects() {
        let extracted = extract_json("Resultado {\"a\": {\"b\": 2}} ok");
        assert_eq!(extracted, "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn test_extract_without_json_returns_original() {
        let text = "  no json here  ";
        assert_eq!(extract_json(text), text);
        assert_eq!(extract_json("only } closing {"), "only } closing {");
    }

    #[test]
    fn test_extract_is_idempotent_on_valid_json() {
        for input in [
            "{\"a\":1}",
            "  [1, 2, 3]  ",
            "{\"nested\": {\"list\": [true, null, \"x\"]}}",
            "42",
            "\"text\"",
        ] {
            let once = extract_json(input);
            assert_eq!(extract_json(&once), once, "input: {input}");
        }
    }

    #[test]
    fn test_extract_repairs_truncated_object() {
        let extracted =
            extract_json("```json\n{\"theses\": [{\"id\": \"T1\", \"title\": \"Cristo\"\n```");
        let value: Value = serde_json::from_str(&extracted).unwrap();
        assert_eq!(value, json!({"theses": [{"id": "T1", "title": "Cristo"}]}));
    }

    #[test]
    fn test_strip_thinking_tags() {
        assert_eq!(strip_thinking_tags("<think>x</think>y"), "y");
        assert_eq!(
            strip_thinking_tags("<think>\nlinha 1\nlinha 2\n</think>\n\n{\"a\": 1}"),
            "{\"a\": 1}"
        );
        assert_eq!(strip_thinking_tags("<think>a</think>b<think>c</think>d"), "bd");
    }

    #[test]
    fn test_strip_thinking_tags_without_tags() {
        assert_eq!(strip_thinking_tags("  {\"a\": 1}  "), "{\"a\": 1}");
        // Case-sensitive: uppercase tags are left alone
        assert_eq!(strip_thinking_tags("<THINK>x</THINK>y"), "<THINK>x</THINK>y");
    }

    #[test]
    fn test_parse_completion() {
        let value = parse_completion("Resposta:\n```json\n{\"duplicates\": []}\n```").unwrap();
        assert_eq!(value, json!({"duplicates": []}));
        assert!(parse_completion("sem json nenhum").is_err());
    }
}
