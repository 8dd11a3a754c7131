//! Grammar correction pipeline.
//!
//! One check runs the stages in a fixed order:
//!
//! 1. **Validate** the request (text length, key, model)
//! 2. **Prompt**: build the instruction and declare the reply contract
//! 3. **Call** Gemini and extract the reply text
//! 4. **Parse** the reply according to the declared contract
//! 5. **Score** both texts and **diff** them word by word
//!
//! Everything except step 3 is pure and synchronous.

pub mod diff;
pub mod gemini;
pub mod prompt;
pub mod readability;
pub mod response;
pub mod types;

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

pub use diff::{diff_words, reconstruct, render_diff_html};
pub use prompt::build_prompt;
pub use readability::calculate_readability;
pub use response::{escape_markup, parse_response};
pub use types::*;

use crate::error::CheckError;
use crate::settings::CheckerConfig;

/// Check a request before anything is sent. Lengths are measured on the
/// trimmed text, in characters.
pub fn validate_request(request: &CheckRequest, max_chars: usize) -> Result<(), CheckError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(CheckError::Validation(
            "Please enter some text to check.".to_string(),
        ));
    }
    let chars = text.chars().count();
    if chars > max_chars {
        return Err(CheckError::Validation(format!(
            "Text is {} characters; the limit is {}.",
            chars, max_chars
        )));
    }
    if request.api_key.trim().is_empty() {
        return Err(CheckError::Validation("API Key is missing.".to_string()));
    }
    if request.model.trim().is_empty() {
        return Err(CheckError::Validation("No model selected.".to_string()));
    }
    Ok(())
}

/// Allows at most one check in flight.
#[derive(Debug, Default)]
pub struct CheckGate {
    running: AtomicBool,
}

/// Releases the gate when dropped, whichever way the check ends.
#[derive(Debug)]
pub struct CheckGuard<'a> {
    gate: &'a CheckGate,
}

impl CheckGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> Result<CheckGuard<'_>, CheckError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CheckError::Validation("A check is already running.".to_string()))?;
        Ok(CheckGuard { gate: self })
    }
}

impl Drop for CheckGuard<'_> {
    fn drop(&mut self) {
        self.gate.running.store(false, Ordering::Release);
    }
}

/// Live statistics for the input pane. `chars` counts the raw text;
/// `over_limit` uses the trimmed length, the same rule as [`validate_request`].
pub fn analyze_input(text: &str, max_chars: usize) -> InputAnalysis {
    let readability = calculate_readability(text);
    InputAnalysis {
        words: readability::count_words(text),
        chars: text.chars().count(),
        max_chars,
        over_limit: text.trim().chars().count() > max_chars,
        readability_label: readability.label(),
        readability,
    }
}

/// Escape explanation items for display.
pub fn render_explanations(items: &[String]) -> Vec<String> {
    items.iter().map(|item| escape_markup(item)).collect()
}

/// Turn a parsed reply into the response the UI renders.
pub fn assemble_response(
    original: &str,
    parsed: ParsedResult,
    contract: OutputContract,
) -> CheckResponse {
    let segments = diff_words(original, &parsed.corrected_text);
    let diff_html = render_diff_html(&segments);

    CheckResponse {
        original_readability: calculate_readability(original),
        corrected_readability: calculate_readability(&parsed.corrected_text),
        explanations: render_explanations(&parsed.explanations),
        advisories: parsed.advisories.iter().map(|a| a.to_string()).collect(),
        corrected_text: parsed.corrected_text,
        segments,
        diff_html,
        contract,
    }
}

/// Run one full check against the configured endpoint.
pub async fn run_check(
    config: &CheckerConfig,
    request: &CheckRequest,
) -> Result<CheckResponse, CheckError> {
    validate_request(request, config.limits.max_chars)?;

    let prompt = build_prompt(&request.text, &request.options, config.explain.contract);
    let raw = gemini::generate(
        &config.endpoint,
        request.model.trim(),
        request.api_key.trim(),
        &prompt,
    )
    .await?;

    let parsed = parse_response(&raw, prompt.contract)?;
    for advisory in &parsed.advisories {
        warn!("Check completed with advisory: {}", advisory);
    }

    let response = assemble_response(&request.text, parsed, prompt.contract);
    info!(
        "Check complete: {} segment(s), {} explanation(s), readability {} -> {}",
        response.segments.len(),
        response.explanations.len(),
        response.original_readability.score,
        response.corrected_readability.score
    );
    Ok(response)
}
