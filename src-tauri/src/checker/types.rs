use std::fmt;

use serde::{Deserialize, Serialize};

/// Target register for the corrected text.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
    #[default]
    General,
    Formal,
    Casual,
    Academic,
    Business,
}

impl Formality {
    /// Human label used both in the UI select and in the tone directive.
    pub fn label(&self) -> &'static str {
        match self {
            Formality::General => "General",
            Formality::Formal => "Formal",
            Formality::Casual => "Casual / Informal",
            Formality::Academic => "Academic",
            Formality::Business => "Business / Professional",
        }
    }
}

/// Per-request correction switches chosen by the user.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorrectionOptions {
    #[serde(default)]
    pub formality: Formality,
    #[serde(default)]
    pub concise: bool,
    #[serde(default)]
    pub explain: bool,
}

/// The reply format the prompt asks for and the parser expects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputContract {
    /// Corrected text only.
    Plain,
    /// Two literal markers, corrected text then bulleted explanations.
    Delimited,
    /// One JSON object with `correctedText` and `explanations`.
    Structured,
}

impl OutputContract {
    /// MIME hint passed to the generation config.
    pub fn response_mime_type(&self) -> &'static str {
        match self {
            OutputContract::Structured => "application/json",
            OutputContract::Plain | OutputContract::Delimited => "text/plain",
        }
    }
}

/// Non-fatal notice shown next to an otherwise successful result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// Explanations were requested but neither marker came back.
    ExplanationsMissing,
    /// Markers were present but out of order or incomplete.
    ExplanationStructureInvalid,
    ClipboardUnavailable,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::ExplanationsMissing => {
                write!(f, "Note: AI did not provide explanations in the expected format.")
            }
            Advisory::ExplanationStructureInvalid => write!(
                f,
                "Note: Could not parse explanations from the AI response structure."
            ),
            Advisory::ClipboardUnavailable => write!(f, "Clipboard is not available."),
        }
    }
}

/// Decoded model reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResult {
    pub corrected_text: String,
    pub explanations: Vec<String>,
    pub advisories: Vec<Advisory>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Equal,
    Added,
    Removed,
}

/// A maximal run of text with one diff tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffSegment {
    pub kind: SegmentKind,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadabilityScore {
    /// Flesch reading ease, clamped to 0-100 and rounded.
    pub score: u8,
    /// Grade label: "~K", "G1".."G16", "Grad+" or "N/A".
    pub grade: String,
}

impl ReadabilityScore {
    pub fn not_available() -> Self {
        Self {
            score: 0,
            grade: "N/A".to_string(),
        }
    }

    /// Display string used under the input and output panes.
    pub fn label(&self) -> String {
        if self.score > 0 {
            format!("Readability: {} ({})", self.score, self.grade)
        } else {
            "Readability: --".to_string()
        }
    }
}

/// Everything the UI needs to start a check.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub text: String,
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub options: CorrectionOptions,
}

/// Result of one check, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResponse {
    pub corrected_text: String,
    /// Markup-escaped explanation items.
    pub explanations: Vec<String>,
    pub advisories: Vec<String>,
    pub segments: Vec<DiffSegment>,
    pub diff_html: String,
    pub original_readability: ReadabilityScore,
    pub corrected_readability: ReadabilityScore,
    pub contract: OutputContract,
}

/// Live statistics for the input pane.
#[derive(Debug, Clone, Serialize)]
pub struct InputAnalysis {
    pub words: usize,
    pub chars: usize,
    pub max_chars: usize,
    pub over_limit: bool,
    pub readability: ReadabilityScore,
    pub readability_label: String,
}
