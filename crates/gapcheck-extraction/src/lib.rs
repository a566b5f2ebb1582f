//! Heuristic extraction of structured JSON from noisy sandbox output.
//!
//! The reasoning CLI returns free-form text that may wrap the real payload
//! in a service envelope, fence it in a markdown block, bury it between
//! prose paragraphs, or truncate it mid-structure. `extract` applies four
//! layered strategies, each attempted only if the previous yields nothing:
//!
//! 1. **Envelope unwrap**: a `{"type":"result","is_error":...,"result":...}`
//!    wrapper. `is_error: true` short-circuits the whole extraction to
//!    `None`; otherwise strategies 2–4 run against the unwrapped `result`
//!    string.
//! 2. **Fenced block**: the contents of a markdown json code fence.
//! 3. **Balanced-candidate scan**: the first brace-delimited substring that
//!    parses, skipping substrings that parse back into the envelope shape.
//! 4. **Truncation repair**: the longest brace-delimited candidate is
//!    replayed character by character with string-state tracking, then
//!    closed out (quote, then brackets, then braces) and reparsed.
//!
//! This precedence is deliberate and fixed: the envelope is the only wrapper
//! with authoritative error signaling, a fence is the service's explicit
//! payload marker, and repair runs last because it can only help when
//! nothing parses as-is.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)```").expect("fenced-json regex is valid"));

/// Extract a structured value from raw sandbox output.
///
/// Returns `None` when nothing extractable is present, when the service
/// envelope reports an error, or when repair fails. Callers treat `None`
/// and a structurally empty value identically to a parse failure.
#[must_use]
pub fn extract(raw: &str) -> Option<Value> {
    match unwrap_envelope(raw) {
        EnvelopeOutcome::Error => return None,
        EnvelopeOutcome::Payload(payload) => {
            if let Some(value) = extract_from_text(&payload) {
                return Some(value);
            }
        }
        EnvelopeOutcome::NotAnEnvelope => {}
    }

    extract_from_text(raw)
}

enum EnvelopeOutcome {
    /// The envelope reported `is_error: true`; extraction must stop.
    Error,
    /// The envelope's `result` payload string.
    Payload(String),
    NotAnEnvelope,
}

/// Whether a parsed value has the service-envelope shape.
fn is_envelope(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("result")
        && value.get("is_error").is_some()
        && value.get("result").is_some()
}

/// Find and interpret the service envelope anywhere in the text.
fn unwrap_envelope(text: &str) -> EnvelopeOutcome {
    for candidate in BalancedCandidates::new(text) {
        let Ok(parsed) = serde_json::from_str::<Value>(candidate) else {
            continue;
        };
        if !is_envelope(&parsed) {
            continue;
        }
        if parsed.get("is_error").and_then(Value::as_bool) == Some(true) {
            return EnvelopeOutcome::Error;
        }
        if let Some(result) = parsed.get("result").and_then(Value::as_str) {
            if !result.trim().is_empty() {
                return EnvelopeOutcome::Payload(result.to_string());
            }
        }
        return EnvelopeOutcome::NotAnEnvelope;
    }
    EnvelopeOutcome::NotAnEnvelope
}

/// Strategies 2-4 against plain text: fenced block, balanced scan, repair.
fn extract_from_text(text: &str) -> Option<Value> {
    if let Some(captures) = FENCED_JSON.captures(text) {
        if let Ok(value) = serde_json::from_str::<Value>(captures[1].trim()) {
            return Some(value);
        }
    }

    for candidate in BalancedCandidates::new(text) {
        if let Ok(parsed) = serde_json::from_str::<Value>(candidate) {
            // The wrapper itself must not win the scan.
            if is_envelope(&parsed) {
                continue;
            }
            return Some(parsed);
        }
    }

    // Nothing parsed whole. The longest brace-delimited candidate runs from
    // the first opening brace to the end of the text; a truncated object has
    // no closing brace at all, so no balanced span can be longer.
    let start = text.find('{')?;
    let repaired = repair_truncated(&text[start..])?;
    // The wrapper must not win here either.
    if is_envelope(&repaired) {
        return None;
    }
    Some(repaired)
}

/// Iterator over top-level brace-delimited substrings, tracking string state
/// so braces inside string literals never open or close a candidate.
struct BalancedCandidates<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> BalancedCandidates<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }
}

impl<'a> Iterator for BalancedCandidates<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() {
            if bytes[self.pos] != b'{' {
                self.pos += 1;
                continue;
            }

            let start = self.pos;
            let mut depth = 0usize;
            let mut in_string = false;
            let mut escaped = false;

            for (offset, &b) in bytes[start..].iter().enumerate() {
                if escaped {
                    escaped = false;
                    continue;
                }
                match b {
                    b'\\' if in_string => escaped = true,
                    b'"' => in_string = !in_string,
                    b'{' if !in_string => depth += 1,
                    b'}' if !in_string => {
                        depth -= 1;
                        if depth == 0 {
                            let end = start + offset + 1;
                            self.pos = end;
                            return Some(&self.text[start..end]);
                        }
                    }
                    _ => {}
                }
            }

            // Unbalanced to end of text; no further candidates.
            self.pos = bytes.len();
            return None;
        }
        None
    }
}

/// Repair a truncated JSON candidate and parse it.
///
/// The text is replayed byte by byte tracking string state (backslash
/// escapes respected, so braces and brackets inside string literals are
/// ignored). Net-open braces and brackets are counted; a closing quote is
/// appended first if the replay ends inside an unterminated string, then
/// the missing closers, brackets before braces.
#[must_use]
pub fn repair_truncated(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }

    let mut open_braces = 0i64;
    let mut open_brackets = 0i64;
    let mut in_string = false;
    let mut escaped = false;

    for &b in text.as_bytes() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => open_braces += 1,
            b'}' if !in_string => open_braces -= 1,
            b'[' if !in_string => open_brackets += 1,
            b']' if !in_string => open_brackets -= 1,
            _ => {}
        }
    }

    let mut repaired = text.to_string();
    if in_string {
        repaired.push('"');
    }
    for _ in 0..open_brackets.max(0) {
        repaired.push(']');
    }
    for _ in 0..open_braces.max(0) {
        repaired.push('}');
    }

    serde_json::from_str(&repaired).ok()
}

/// Whether an extracted value is structurally empty.
///
/// Callers treat these identically to extraction failure: the run produced
/// nothing usable.
#[must_use]
pub fn is_structurally_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_json_value() -> impl Strategy<Value = serde_json::Value> {
        let leaf = prop_oneof![
            Just(serde_json::Value::Null),
            any::<bool>().prop_map(serde_json::Value::from),
            any::<i64>().prop_map(serde_json::Value::from),
            "[a-z {}\\[\\]\"\\\\]{0,12}".prop_map(serde_json::Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::from),
                prop::collection::btree_map("[a-z]{1,6}", inner, 1..4)
                    .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn extract_recovers_any_embedded_object(value in arb_json_value()) {
            let object = serde_json::json!({ "payload": value });
            let text = format!("prefix text\n{object}\nsuffix");
            let extracted = extract(&text).expect("object should extract");
            prop_assert_eq!(extracted, object);
        }

        #[test]
        fn repair_never_panics_on_prefixes(value in arb_json_value(), cut in 1usize..200) {
            let object = serde_json::json!({ "payload": value });
            let serialized = object.to_string();
            let cut = cut.min(serialized.len());
            // Slice on a char boundary to keep the prefix valid UTF-8.
            let mut end = cut;
            while !serialized.is_char_boundary(end) {
                end -= 1;
            }
            let _ = repair_truncated(&serialized[..end]);
        }

        #[test]
        fn extract_never_panics_on_arbitrary_text(text in ".{0,300}") {
            let _ = extract(&text);
        }
    }
}
