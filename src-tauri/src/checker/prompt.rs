use super::types::{CorrectionOptions, Formality, OutputContract};

/// Marker that precedes the corrected text in a delimited reply.
pub const CORRECTED_TEXT_MARKER: &str = "**Corrected Text:**";
/// Marker that precedes the bulleted explanations in a delimited reply.
pub const EXPLANATIONS_MARKER: &str = "**Explanations:**";

/// An instruction string together with the reply contract it declares.
/// The parser must be driven by `contract`, never by sniffing the reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub text: String,
    pub contract: OutputContract,
}

/// Pick the contract for one exchange.
/// `explained` is the deployment's explained-mode contract and is only used
/// when the user asked for explanations.
pub fn select_contract(options: &CorrectionOptions, explained: OutputContract) -> OutputContract {
    if options.explain {
        explained
    } else {
        OutputContract::Plain
    }
}

/// JSON schema for the structured reply, sent as the generation response schema.
pub fn correction_json_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "correctedText": {
                "type": "string",
                "description": "The full corrected text, formatting preserved"
            },
            "explanations": {
                "type": "array",
                "items": { "type": "string" },
                "description": "One short sentence per significant change"
            }
        },
        "required": ["correctedText", "explanations"]
    })
}

/// Build the correction prompt.
///
/// Sections are emitted in a fixed order: role and invariant rules, option
/// directives, exactly one output-format directive, then the framed text.
pub fn build_prompt(text: &str, options: &CorrectionOptions, explained: OutputContract) -> Prompt {
    let contract = select_contract(options, explained);

    let mut lines: Vec<String> = vec![
        "You are an expert proofreader and editor.".to_string(),
        "Correct the following text for grammar, spelling, and punctuation errors.".to_string(),
        "Strictly preserve the original formatting (line breaks, paragraphs, indentation) unless correcting errors requires minor adjustments.".to_string(),
        "Keep the text in its original language.".to_string(),
    ];

    if options.formality != Formality::General {
        lines.push(format!(
            "Adjust the tone and style for {}. Keep source language.",
            options.formality.label()
        ));
    }
    if options.concise {
        lines.push(
            "Make the text more concise where possible without losing essential meaning."
                .to_string(),
        );
    }

    match contract {
        OutputContract::Plain => {
            lines.push("Only return the resulting corrected text, without any extra conversational text, delimiters, explanations, or remarks. All responses should be in the same language as the original text.".to_string());
        }
        OutputContract::Delimited => {
            lines.push(
                "After making corrections, present the final text clearly delimited like this:"
                    .to_string(),
            );
            lines.push(CORRECTED_TEXT_MARKER.to_string());
            lines.push("[The final, corrected text goes here]".to_string());
            lines.push(
                "\nThen, provide a brief bulleted list of the main changes made, delimited like this:"
                    .to_string(),
            );
            lines.push(EXPLANATIONS_MARKER.to_string());
            lines.push("- [Explanation for change 1]".to_string());
            lines.push("- [Explanation for change 2]".to_string());
            lines.push("If no significant changes were made, state that clearly in the explanation section.".to_string());
            lines.push("Do NOT include any other conversational text, apologies, or summaries outside these delimited sections. All responses should be in the same language as the original text.".to_string());
        }
        OutputContract::Structured => {
            lines.push("Respond with a single JSON object and nothing else, no markdown formatting or code blocks.".to_string());
            lines.push("The object must have exactly two fields:".to_string());
            lines.push("- \"correctedText\": the final, corrected text as a string".to_string());
            lines.push("- \"explanations\": an array of strings, one brief explanation per main change (an empty array if no significant changes were made)".to_string());
            lines.push("All strings should be in the same language as the original text.".to_string());
        }
    }

    let text = format!(
        "{}\n\n--- START TEXT ---\n{}\n--- END TEXT ---",
        lines.join("\n"),
        text
    );

    Prompt { text, contract }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(formality: Formality, concise: bool, explain: bool) -> CorrectionOptions {
        CorrectionOptions {
            formality,
            concise,
            explain,
        }
    }

    #[test]
    fn test_plain_prompt_has_no_markers() {
        let prompt = build_prompt(
            "teh cat",
            &opts(Formality::General, false, false),
            OutputContract::Delimited,
        );
        assert_eq!(prompt.contract, OutputContract::Plain);
        assert!(prompt.text.contains("Only return the resulting corrected text"));
        assert!(!prompt.text.contains(CORRECTED_TEXT_MARKER));
        assert!(!prompt.text.contains(EXPLANATIONS_MARKER));
        assert!(!prompt.text.contains("JSON"));
    }

    #[test]
    fn test_general_formality_emits_no_tone_directive() {
        let prompt = build_prompt("x", &CorrectionOptions::default(), OutputContract::Delimited);
        assert!(!prompt.text.contains("Adjust the tone"));
        assert!(!prompt.text.contains("more concise"));
    }

    #[test]
    fn test_option_directives() {
        let prompt = build_prompt(
            "x",
            &opts(Formality::Casual, true, false),
            OutputContract::Delimited,
        );
        assert!(prompt
            .text
            .contains("Adjust the tone and style for Casual / Informal. Keep source language."));
        assert!(prompt.text.contains("more concise"));
    }

    #[test]
    fn test_delimited_markers_in_order() {
        let prompt = build_prompt(
            "x",
            &opts(Formality::General, false, true),
            OutputContract::Delimited,
        );
        assert_eq!(prompt.contract, OutputContract::Delimited);
        let a = prompt.text.find(CORRECTED_TEXT_MARKER).unwrap();
        let b = prompt.text.find(EXPLANATIONS_MARKER).unwrap();
        assert!(a < b);
        assert!(!prompt.text.contains("correctedText"));
    }

    #[test]
    fn test_structured_contract_declared() {
        let prompt = build_prompt(
            "x",
            &opts(Formality::General, false, true),
            OutputContract::Structured,
        );
        assert_eq!(prompt.contract, OutputContract::Structured);
        assert!(prompt.text.contains("\"correctedText\""));
        assert!(prompt.text.contains("\"explanations\""));
        assert!(!prompt.text.contains(CORRECTED_TEXT_MARKER));
    }

    #[test]
    fn test_section_order() {
        let prompt = build_prompt(
            "Some input.",
            &opts(Formality::Formal, true, true),
            OutputContract::Delimited,
        );
        let role = prompt.text.find("expert proofreader").unwrap();
        let tone = prompt.text.find("Adjust the tone").unwrap();
        let concise = prompt.text.find("more concise").unwrap();
        let format = prompt.text.find(CORRECTED_TEXT_MARKER).unwrap();
        let start = prompt.text.find("--- START TEXT ---").unwrap();
        assert!(role < tone && tone < concise && concise < format && format < start);
        assert!(prompt.text.ends_with("Some input.\n--- END TEXT ---"));
    }

    #[test]
    fn test_text_is_embedded_verbatim() {
        let input = "  line one\n\n\tline two  ";
        let prompt = build_prompt(input, &CorrectionOptions::default(), OutputContract::Delimited);
        assert!(prompt.text.contains(&format!("--- START TEXT ---\n{}\n--- END TEXT ---", input)));
    }

    #[test]
    fn test_schema_fields() {
        let schema = correction_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["correctedText"]["type"], "string");
        assert_eq!(schema["properties"]["explanations"]["items"]["type"], "string");
    }
}
