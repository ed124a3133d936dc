//! Tolerant decoding of model output into typed values
//!
//! Models asked for JSON still wrap it in prose or code fences, drop closing
//! brackets when truncated and leave trailing commas. `repair` applies a fixed
//! pipeline of text fixes; `decode` repairs and then parses strictly.
//!
//! Every step is string-aware: brackets, commas and colons inside JSON string
//! literals are never touched. Input that already parses is returned as-is
//! (after trimming), and `repair(repair(x)) == repair(x)`.

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

const FENCE: &str = "```";

/// Output could not be parsed even after repair
#[derive(Debug, Error)]
#[error("Failed to decode model output: {source}")]
pub struct DecodeError {
    /// Text exactly as the model produced it
    pub raw: String,
    /// Text after repair, as handed to the parser
    pub cleaned: String,
    #[source]
    pub source: serde_json::Error,
}

/// Repair common defects in model-produced JSON
pub fn repair(raw: &str) -> String {
    let trimmed = trim_json_ws(raw);
    if is_valid_json(trimmed) {
        return trimmed.to_string();
    }
    debug!(len = raw.len(), "repair: input is not valid JSON, repairing");

    let text = skip_leading_prose(trimmed);
    let text = cut_trailing_text(text);
    let text = strip_fences(text);
    let text = collapse_key_separators(text);
    let text = balance_brackets(&text);
    let text = strip_trailing_commas(&text);
    trim_json_ws(&text).to_string()
}

/// Repair `raw` and parse it into `T`
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, DecodeError> {
    let cleaned = repair(raw);
    serde_json::from_str(&cleaned).map_err(|source| {
        debug!(error = %source, "decode: parse failed after repair");
        DecodeError {
            raw: raw.to_string(),
            cleaned,
            source,
        }
    })
}

fn is_json_ws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn trim_json_ws(s: &str) -> &str {
    s.trim_matches(is_json_ws)
}

fn is_valid_json(s: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(s).is_ok()
}

/// Drop anything before the first `{` or `[`
fn skip_leading_prose(s: &str) -> &str {
    match s.find(['{', '[']) {
        Some(idx) => &s[idx..],
        None => s,
    }
}

/// Drop anything after the first top-level value closes
///
/// A closing fence or sign-off following the value goes with it. Text whose
/// value never closes is returned unchanged for `balance_brackets`.
fn cut_trailing_text(s: &str) -> &str {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        let closed = match c {
            '"' => {
                in_string = true;
                false
            }
            '{' | '[' => {
                stack.push(c);
                false
            }
            '}' if stack.last() == Some(&'{') => {
                stack.pop();
                stack.is_empty()
            }
            ']' if stack.last() == Some(&'[') => {
                stack.pop();
                stack.is_empty()
            }
            _ => false,
        };
        if closed {
            return &s[..idx + c.len_utf8()];
        }
    }
    s
}

/// Remove ``` fence lines at either end
fn strip_fences(mut s: &str) -> &str {
    while s.starts_with(FENCE) {
        s = match s.find('\n') {
            Some(idx) => trim_json_ws(&s[idx + 1..]),
            None => "",
        };
    }
    while let Some(rest) = s.strip_suffix(FENCE) {
        s = trim_json_ws(rest);
    }
    s
}

/// Collapse `"key": :, value` into `"key": value`
///
/// Only a run following a closed string literal and a colon is rewritten.
fn collapse_key_separators(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < n {
        let c = chars[i];
        out.push(c);
        i += 1;

        if !in_string {
            if c == '"' {
                in_string = true;
            }
            continue;
        }

        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            in_string = false;
            let mut j = i;
            while j < n && is_json_ws(chars[j]) {
                j += 1;
            }
            if j < n && chars[j] == ':' {
                let mut k = j + 1;
                let mut stray = false;
                while k < n && (is_json_ws(chars[k]) || matches!(chars[k], ':' | ',')) {
                    stray |= matches!(chars[k], ':' | ',');
                    k += 1;
                }
                if stray {
                    out.push_str(": ");
                    i = k;
                }
            }
        }
    }
    out
}

/// Close an unterminated string and any unclosed brackets
///
/// Unmatched closers are left in place for the parser to reject.
fn balance_brackets(s: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in s.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => stack.push(c),
            '}' if stack.last() == Some(&'{') => {
                stack.pop();
            }
            ']' if stack.last() == Some(&'[') => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut out = s.to_string();
    if in_string {
        // A dangling backslash would escape a lone closing quote
        out.push_str(if escaped { "\"\"" } else { "\"" });
    }
    for open in stack.iter().rev() {
        out.push(if *open == '{' { '}' } else { ']' });
    }
    out
}

/// Drop commas that directly precede `}` or `]`
fn strip_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < n {
        let c = chars[i];
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if c == ',' {
            let mut j = i;
            while j < n && (chars[j] == ',' || is_json_ws(chars[j])) {
                j += 1;
            }
            if j < n && matches!(chars[j], '}' | ']') {
                i = j;
                continue;
            }
        }

        if c == '"' {
            in_string = true;
        }
        out.push(c);
        i += 1;
    }
    out
}
