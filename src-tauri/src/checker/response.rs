use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use super::prompt::{CORRECTED_TEXT_MARKER, EXPLANATIONS_MARKER};
use super::types::{Advisory, OutputContract, ParsedResult};
use crate::error::CheckError;

/// Phrase the model uses when it found nothing to explain.
/// Matched as a case-insensitive substring; this is a heuristic, not a classifier.
const NO_CHANGES_PHRASE: &str = "no major changes";

#[derive(Debug, Deserialize)]
struct StructuredReply {
    #[serde(rename = "correctedText", default)]
    corrected_text: String,
    #[serde(default)]
    explanations: Vec<String>,
}

/// Decode a raw model reply according to the contract the prompt declared.
///
/// Plain and delimited replies never fail: an undecodable delimited reply
/// degrades to the whole reply as corrected text plus an advisory. A structured
/// reply that is not valid JSON of the expected shape is a hard
/// [`CheckError::Decode`].
pub fn parse_response(raw: &str, contract: OutputContract) -> Result<ParsedResult, CheckError> {
    match contract {
        OutputContract::Plain => Ok(ParsedResult {
            corrected_text: raw.trim().to_string(),
            ..Default::default()
        }),
        OutputContract::Delimited => Ok(parse_delimited(raw)),
        OutputContract::Structured => parse_structured(raw),
    }
}

fn parse_delimited(raw: &str) -> ParsedResult {
    let corrected_at = raw.find(CORRECTED_TEXT_MARKER);
    let explanations_at = raw.find(EXPLANATIONS_MARKER);

    let (corrected_at, explanations_at) = match (corrected_at, explanations_at) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            warn!("Explanations requested but delimiters not found; using full response as text");
            return fallback(raw, Advisory::ExplanationsMissing);
        }
    };

    let payload_start = corrected_at + CORRECTED_TEXT_MARKER.len();
    if explanations_at <= payload_start {
        warn!("Delimiters out of order or incomplete; using full response as text");
        return fallback(raw, Advisory::ExplanationStructureInvalid);
    }

    let corrected_text = raw[payload_start..explanations_at].trim().to_string();
    let body = raw[explanations_at + EXPLANATIONS_MARKER.len()..].trim();
    let explanations = split_explanations(body);
    info!("Parsed {} explanation item(s)", explanations.len());

    ParsedResult {
        corrected_text,
        explanations,
        advisories: Vec::new(),
    }
}

fn fallback(raw: &str, advisory: Advisory) -> ParsedResult {
    ParsedResult {
        corrected_text: raw.trim().to_string(),
        explanations: Vec::new(),
        advisories: vec![advisory],
    }
}

/// Split an explanation body into bullet items.
///
/// Items start at a line break followed by `"- "`. A lone item mentioning
/// "no major changes" counts as no explanations at all.
pub fn split_explanations(body: &str) -> Vec<String> {
    static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n]+- ").unwrap());

    let items: Vec<String> = BULLET
        .split(body)
        .map(|item| item.trim())
        .map(|item| item.strip_prefix("- ").unwrap_or(item).trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect();

    if items.len() == 1 && items[0].to_lowercase().contains(NO_CHANGES_PHRASE) {
        return Vec::new();
    }
    items
}

fn parse_structured(raw: &str) -> Result<ParsedResult, CheckError> {
    let text = strip_markdown_json(raw);
    let reply: StructuredReply = serde_json::from_str(&text).map_err(|e| {
        let truncated: String = text.chars().take(200).collect();
        warn!("Structured reply did not decode: {}", e);
        CheckError::Decode(format!("{} (reply began: {})", e, truncated))
    })?;

    let explanations = reply
        .explanations
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect();

    Ok(ParsedResult {
        corrected_text: reply.corrected_text.trim().to_string(),
        explanations,
        advisories: Vec::new(),
    })
}

/// Strip markdown code fences from an LLM reply if present.
/// Models without a strict JSON mode sometimes wrap JSON in ```json ... ```.
fn strip_markdown_json(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let after_open = match trimmed.find('\n') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    };
    let cleaned = after_open.trim_end();
    match cleaned.strip_suffix("```") {
        Some(inner) => inner.trim().to_string(),
        None => cleaned.to_string(),
    }
}

/// Escape text for insertion into markup.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delimited(corrected: &str, explanations: &str) -> String {
        format!(
            "{}\n{}\n\n{}\n{}",
            CORRECTED_TEXT_MARKER, corrected, EXPLANATIONS_MARKER, explanations
        )
    }

    #[test]
    fn test_plain_trims() {
        let parsed = parse_response("  Hello world.\n", OutputContract::Plain).unwrap();
        assert_eq!(parsed.corrected_text, "Hello world.");
        assert!(parsed.explanations.is_empty());
        assert!(parsed.advisories.is_empty());
    }

    #[test]
    fn test_plain_ignores_markers() {
        let raw = delimited("Fixed text.", "- Fixed a typo");
        let parsed = parse_response(&raw, OutputContract::Plain).unwrap();
        assert_eq!(parsed.corrected_text, raw.trim());
        assert!(parsed.explanations.is_empty());
    }

    #[test]
    fn test_delimited_happy_path() {
        let raw = delimited("Fixed text.", "- Fixed a typo\n- Added a comma");
        let parsed = parse_response(&raw, OutputContract::Delimited).unwrap();
        assert_eq!(parsed.corrected_text, "Fixed text.");
        assert_eq!(parsed.explanations, vec!["Fixed a typo", "Added a comma"]);
        assert!(parsed.advisories.is_empty());
    }

    #[test]
    fn test_delimited_crlf_bullets() {
        let raw = delimited("Fixed.", "- One\r\n- Two\r\n\r\n- Three");
        let parsed = parse_response(&raw, OutputContract::Delimited).unwrap();
        assert_eq!(parsed.explanations, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn test_delimited_no_major_changes_is_neutral() {
        let raw = delimited("Fine as is.", "No major changes were needed.");
        let parsed = parse_response(&raw, OutputContract::Delimited).unwrap();
        assert_eq!(parsed.corrected_text, "Fine as is.");
        assert!(parsed.explanations.is_empty());
        assert!(parsed.advisories.is_empty());
    }

    #[test]
    fn test_delimited_no_major_changes_case_insensitive_with_bullet() {
        let raw = delimited("Fine.", "- NO MAJOR CHANGES.");
        let parsed = parse_response(&raw, OutputContract::Delimited).unwrap();
        assert!(parsed.explanations.is_empty());
    }

    #[test]
    fn test_delimited_phrase_among_several_items_is_kept() {
        let raw = delimited("Fine.", "- Fixed a typo\n- Otherwise no major changes");
        let parsed = parse_response(&raw, OutputContract::Delimited).unwrap();
        assert_eq!(parsed.explanations.len(), 2);
    }

    #[test]
    fn test_delimited_empty_body() {
        let raw = delimited("Fine.", "   ");
        let parsed = parse_response(&raw, OutputContract::Delimited).unwrap();
        assert_eq!(parsed.corrected_text, "Fine.");
        assert!(parsed.explanations.is_empty());
        assert!(parsed.advisories.is_empty());
    }

    #[test]
    fn test_delimited_missing_markers_falls_back() {
        let parsed = parse_response("  Just the text.  ", OutputContract::Delimited).unwrap();
        assert_eq!(parsed.corrected_text, "Just the text.");
        assert!(parsed.explanations.is_empty());
        assert_eq!(parsed.advisories, vec![Advisory::ExplanationsMissing]);
    }

    #[test]
    fn test_delimited_out_of_order_falls_back() {
        let raw = format!(
            "{}\n- Fixed\n{}\nText.",
            EXPLANATIONS_MARKER, CORRECTED_TEXT_MARKER
        );
        let parsed = parse_response(&raw, OutputContract::Delimited).unwrap();
        assert_eq!(parsed.corrected_text, raw.trim());
        assert!(parsed.explanations.is_empty());
        assert_eq!(parsed.advisories, vec![Advisory::ExplanationStructureInvalid]);
    }

    #[test]
    fn test_delimited_adjacent_markers_is_invalid() {
        let raw = format!("{}{}- item", CORRECTED_TEXT_MARKER, EXPLANATIONS_MARKER);
        let parsed = parse_response(&raw, OutputContract::Delimited).unwrap();
        assert_eq!(parsed.advisories, vec![Advisory::ExplanationStructureInvalid]);
    }

    #[test]
    fn test_structured_happy_path() {
        let raw = r#"{"correctedText": " Fixed text. ", "explanations": ["Fixed a typo", "  ", "Added a comma"]}"#;
        let parsed = parse_response(raw, OutputContract::Structured).unwrap();
        assert_eq!(parsed.corrected_text, "Fixed text.");
        assert_eq!(parsed.explanations, vec!["Fixed a typo", "Added a comma"]);
    }

    #[test]
    fn test_structured_defaults() {
        let parsed = parse_response("{}", OutputContract::Structured).unwrap();
        assert_eq!(parsed.corrected_text, "");
        assert!(parsed.explanations.is_empty());
    }

    #[test]
    fn test_structured_fenced() {
        let raw = "```json\n{\"correctedText\": \"Hi.\", \"explanations\": []}\n```";
        let parsed = parse_response(raw, OutputContract::Structured).unwrap();
        assert_eq!(parsed.corrected_text, "Hi.");
    }

    #[test]
    fn test_structured_malformed_is_hard_error() {
        let result = parse_response("{\"correctedText\": \"Hi.\"", OutputContract::Structured);
        assert!(matches!(result, Err(CheckError::Decode(_))));
    }

    #[test]
    fn test_structured_does_not_fall_back_to_markers() {
        let raw = delimited("Fixed text.", "- Fixed a typo");
        let result = parse_response(&raw, OutputContract::Structured);
        assert!(matches!(result, Err(CheckError::Decode(_))));
    }

    #[test]
    fn test_structured_wrong_shape_is_hard_error() {
        let result = parse_response(r#"{"explanations": "not a list"}"#, OutputContract::Structured);
        assert!(matches!(result, Err(CheckError::Decode(_))));
    }

    #[test]
    fn test_escape_markup() {
        assert_eq!(
            escape_markup("<script>alert('x')</script>"),
            "&lt;script&gt;alert('x')&lt;/script&gt;"
        );
        assert_eq!(escape_markup("a & b"), "a &amp; b");
        assert_eq!(escape_markup("plain"), "plain");
    }

    #[test]
    fn test_strip_markdown_json() {
        assert_eq!(strip_markdown_json("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_markdown_json("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_markdown_json("```json\n{\"a\":1}"), "{\"a\":1}");
    }
}
