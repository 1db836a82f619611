//! Tolerant single-pass JSON repair.
//!
//! Scans the input once, tracking string state and the open container stack
//! (the same balancing approach as a brace matcher), and rewrites the common
//! defects of model output:
//!
//! - trailing commas before `}` / `]`
//! - missing commas between adjacent values
//! - single-quoted strings and unquoted keys or string values
//! - Python literals (`True`, `False`, `None`)
//! - `//` and `/* */` comments
//! - raw control characters and invalid escapes inside strings
//! - truncated output (unterminated strings, dangling keys, unclosed containers)
//!
//! Text after the root value closes is discarded.

/// Repair common JSON syntax defects. The result is not guaranteed to parse.
pub fn repair_json(input: &str) -> String {
    let mut repairer = Repairer::new(input.len());
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        match ch {
            '"' | '\'' => {
                i = repairer.string(&chars, i);
                continue;
            }
            '{' | '[' => {
                repairer.before_value();
                repairer.open(ch);
            }
            '}' | ']' => {
                if repairer.close() {
                    break;
                }
            }
            ',' => repairer.comma(),
            ':' => repairer.push(':'),
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
                continue;
            }
            c if c.is_whitespace() => repairer.out.push(c),
            _ => {
                i = repairer.bare_word(&chars, i);
                continue;
            }
        }
        i += 1;
    }

    repairer.finish()
}

struct Repairer {
    out: String,
    stack: Vec<char>,
    started: bool,
}

impl Repairer {
    fn new(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity + 8),
            stack: Vec::new(),
            started: false,
        }
    }

    /// Last non-whitespace character written so far.
    fn last_significant(&self) -> Option<char> {
        self.out.chars().rev().find(|c| !c.is_whitespace())
    }

    fn trim_trailing_whitespace(&mut self) {
        let len = self.out.trim_end().len();
        self.out.truncate(len);
    }

    fn push(&mut self, c: char) {
        self.out.push(c);
    }

    /// Insert a separator when a value directly follows another value.
    fn before_value(&mut self) {
        if self.stack.is_empty() {
            return;
        }
        match self.last_significant() {
            None | Some('{') | Some('[') | Some(',') | Some(':') => {}
            Some(_) => {
                self.trim_trailing_whitespace();
                self.out.push(',');
                self.out.push(' ');
            }
        }
    }

    fn open(&mut self, c: char) {
        self.started = true;
        self.stack.push(c);
        self.out.push(c);
    }

    /// Close the innermost container; returns true once the root closes.
    fn close(&mut self) -> bool {
        let Some(open) = self.stack.pop() else {
            // Stray closer with nothing open
            return self.started;
        };
        self.drop_dangling_separator();
        self.out.push(if open == '{' { '}' } else { ']' });
        self.stack.is_empty()
    }

    fn comma(&mut self) {
        match self.last_significant() {
            // Leading or doubled commas carry no value
            None | Some('{') | Some('[') | Some(',') => {}
            Some(':') => {
                self.out.push_str("null,");
            }
            Some(_) => self.out.push(','),
        }
    }

    /// Remove a trailing comma, and complete a key left without a value.
    fn drop_dangling_separator(&mut self) {
        self.trim_trailing_whitespace();
        if self.out.ends_with(',') {
            self.out.pop();
            self.trim_trailing_whitespace();
        }
        if self.out.ends_with(':') {
            self.out.push_str(" null");
        }
    }

    /// Copy a quoted string starting at `start`, normalizing to double quotes.
    fn string(&mut self, chars: &[char], start: usize) -> usize {
        self.before_value();
        self.started = true;

        let quote = chars[start];
        let mut i = start + 1;
        self.out.push('"');

        while i < chars.len() {
            let c = chars[i];
            match c {
                '\\' => {
                    match chars.get(i + 1) {
                        Some(&next @ ('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u')) => {
                            self.out.push('\\');
                            self.out.push(next);
                        }
                        Some('\'') => self.out.push('\''),
                        Some(&other) => {
                            self.out.push_str("\\\\");
                            self.out.push(other);
                        }
                        None => {}
                    }
                    i += 2;
                    continue;
                }
                c if c == quote => {
                    self.out.push('"');
                    return i + 1;
                }
                '"' => self.out.push_str("\\\""),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                c if c.is_control() => {
                    self.out.push_str(&format!("\\u{:04x}", c as u32));
                }
                c => self.out.push(c),
            }
            i += 1;
        }

        // Unterminated string at end of input
        self.out.push('"');
        i
    }

    /// Copy an unquoted token: literal, number, or a bare word to be quoted.
    fn bare_word(&mut self, chars: &[char], start: usize) -> usize {
        let mut i = start;
        while i < chars.len() && is_word_char(chars[i]) {
            i += 1;
        }
        if i == start {
            // Unrecognized punctuation outside a string
            return start + 1;
        }

        let word: String = chars[start..i].iter().collect();
        self.before_value();
        self.started = true;

        match word.as_str() {
            "true" | "True" => self.out.push_str("true"),
            "false" | "False" => self.out.push_str("false"),
            "null" | "None" | "undefined" => self.out.push_str("null"),
            w if is_number(w) => self.out.push_str(w),
            w => {
                self.out.push('"');
                self.out.push_str(&w.replace('"', "\\\""));
                self.out.push('"');
            }
        }
        i
    }

    fn finish(mut self) -> String {
        while !self.stack.is_empty() {
            self.close();
        }
        self.trim_trailing_whitespace();
        if self.out.ends_with(',') {
            self.out.pop();
        }
        self.out
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '+' | '.' | '$')
}

fn is_number(word: &str) -> bool {
    let first = word.chars().next();
    matches!(first, Some(c) if c.is_ascii_digit() || c == '-')
        && word.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn repaired(input: &str) -> Value {
        let out = repair_json(input);
        serde_json::from_str(&out).unwrap_or_else(|e| panic!("{out:?} did not parse: {e}"))
    }

    #[test]
    fn test_trailing_commas() {
        assert_eq!(repaired("{\"a\": 1, \"b\": [1,2,3,],}"), json!({"a": 1, "b": [1, 2, 3]}));
        assert_eq!(repaired("[1, 2, ]"), json!([1, 2]));
    }

    #[test]
    fn test_missing_commas_between_values() {
        assert_eq!(
            repaired("{\"a\": 1 \"b\": 2}"),
            json!({"a": 1, "b": 2})
        );
        assert_eq!(repaired("[{\"a\": 1} {\"a\": 2}]"), json!([{"a": 1}, {"a": 2}]));
    }

    #[test]
    fn test_single_quotes_and_bare_keys() {
        assert_eq!(
            repaired("{'reference': 'Jo 3:16', citation_type: biblical}"),
            json!({"reference": "Jo 3:16", "citation_type": "biblical"})
        );
    }

    #[test]
    fn test_python_literals() {
        assert_eq!(
            repaired("{\"a\": True, \"b\": False, \"c\": None}"),
            json!({"a": true, "b": false, "c": null})
        );
    }

    #[test]
    fn test_comments_removed() {
        assert_eq!(
            repaired("{\n  // nota\n  \"a\": 1, /* bloco */ \"b\": 2\n}"),
            json!({"a": 1, "b": 2})
        );
    }

    #[test]
    fn test_raw_newlines_inside_strings() {
        assert_eq!(repaired("{\"a\": \"linha 1\nlinha 2\"}"), json!({"a": "linha 1\nlinha 2"}));
    }

    #[test]
    fn test_truncated_structures() {
        assert_eq!(
            repaired("{\"theses\": [{\"id\": \"T1\", \"title\": \"Cristo"),
            json!({"theses": [{"id": "T1", "title": "Cristo"}]})
        );
        assert_eq!(repaired("{\"a\": 1, \"b\":"), json!({"a": 1, "b": null}));
        assert_eq!(repaired("[1, 2,"), json!([1, 2]));
    }

    #[test]
    fn test_trailing_text_after_root_discarded() {
        assert_eq!(repaired("{\"a\": 1} e mais texto {"), json!({"a": 1}));
    }

    #[test]
    fn test_numbers_preserved() {
        assert_eq!(
            repaired("{\"confidence\": 0.85, \"page\": -3, \"e\": 1e3,}"),
            json!({"confidence": 0.85, "page": -3, "e": 1000.0})
        );
    }

    #[test]
    fn test_invalid_escapes() {
        assert_eq!(repaired("{\"a\": \"it\\'s\"}"), json!({"a": "it's"}));
        assert_eq!(repaired("{\"a\": \"C:\\x\"}"), json!({"a": "C:\\x"}));
    }

    #[test]
    fn test_valid_json_survives() {
        let input = "{\"a\": [1, {\"b\": \"c, d\"}], \"e\": null}";
        assert_eq!(repaired(input), json!({"a": [1, {"b": "c, d"}], "e": null}));
    }
}
