//! Word-level diff between the original and corrected text.
//!
//! Alignment is delegated to `similar` in its words tokenization, where runs
//! of whitespace are tokens of their own. Whitespace is therefore carried
//! through unchanged and the segments reproduce both inputs byte for byte.

use similar::{Algorithm, ChangeTag, TextDiff};

use super::response::escape_markup;
use super::types::{DiffSegment, SegmentKind};

/// Align `original` and `corrected` and merge consecutive changes of the same
/// kind into segments.
pub fn diff_words(original: &str, corrected: &str) -> Vec<DiffSegment> {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_words(original, corrected);

    let mut segments: Vec<DiffSegment> = Vec::new();
    for change in diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => SegmentKind::Equal,
            ChangeTag::Insert => SegmentKind::Added,
            ChangeTag::Delete => SegmentKind::Removed,
        };
        match segments.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(change.value()),
            _ => segments.push(DiffSegment {
                kind,
                text: change.value().to_string(),
            }),
        }
    }
    segments
}

/// Text on one side of the diff: `Removed` gives the original, `Added` the
/// corrected text.
pub fn reconstruct(segments: &[DiffSegment], side: SegmentKind) -> String {
    segments
        .iter()
        .filter(|s| s.kind == SegmentKind::Equal || s.kind == side)
        .map(|s| s.text.as_str())
        .collect()
}

/// Serialize segments as `<ins>`/`<del>`/`<span>` markup with escaped text
/// and `<br>` line breaks.
pub fn render_diff_html(segments: &[DiffSegment]) -> String {
    let mut html = String::new();
    for segment in segments {
        let value = escape_markup(&segment.text).replace('\n', "<br>");
        let tag = match segment.kind {
            SegmentKind::Added => "ins",
            SegmentKind::Removed => "del",
            SegmentKind::Equal => "span",
        };
        html.push_str(&format!("<{tag}>{value}</{tag}>"));
    }
    html
}
