//! Gemini `generateContent` client, direct or through a forwarding proxy.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::prompt::{correction_json_schema, Prompt};
use super::types::OutputContract;
use crate::error::CheckError;
use crate::settings::{EndpointConfig, Transport};

const TEMPERATURE: f32 = 0.2;
const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const BLOCK_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: String,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

/// Body sent to the forwarding proxy: the target URL plus the Gemini payload.
#[derive(Debug, Serialize)]
struct ProxyRequest<'a> {
    endpoint: String,
    #[serde(flatten)]
    payload: &'a GenerateRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SafetyRating {
    category: String,
    #[serde(default)]
    blocked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Build the `generateContent` URL for a model. Contains the key; never log it.
pub fn target_url(api_base: &str, model: &str, api_key: &str) -> String {
    format!(
        "{}/{}:generateContent?key={}",
        api_base.trim_end_matches('/'),
        model,
        api_key
    )
}

/// Build the request payload for a prompt. The contract picks the MIME hint
/// and, for structured replies, the response schema.
pub fn build_request(prompt: &Prompt) -> GenerateRequest {
    let response_schema = match prompt.contract {
        OutputContract::Structured => Some(correction_json_schema()),
        OutputContract::Plain | OutputContract::Delimited => None,
    };

    GenerateRequest {
        contents: vec![RequestContent {
            role: "user".to_string(),
            parts: vec![RequestPart {
                text: prompt.text.clone(),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            response_mime_type: prompt.contract.response_mime_type().to_string(),
            response_schema,
        },
        safety_settings: HARM_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category: category.to_string(),
                threshold: BLOCK_THRESHOLD.to_string(),
            })
            .collect(),
    }
}

/// Map a non-success HTTP reply to a user-facing error.
pub fn classify_http_error(status: u16, body: &str) -> CheckError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| {
            v["error"]["message"]
                .as_str()
                .or_else(|| v["message"].as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| format!("Request failed: {}", status));

    if message.contains("API key not valid") {
        CheckError::Transport("Invalid Google AI API Key provided.".to_string())
    } else if status == 400 && message.contains("triggering safety filters") {
        CheckError::UpstreamRefusal(format!("Request blocked by safety filter: {}", message))
    } else if status == 429 {
        CheckError::Transport("API Rate Limit Exceeded.".to_string())
    } else if status >= 500 {
        CheckError::Transport("Proxy or Google AI Service Error.".to_string())
    } else {
        CheckError::Transport(format!("Error ({}): {}", status, message))
    }
}

/// Pull the reply text out of a decoded response.
///
/// A prompt block, an empty candidate list, any finish reason other than
/// `STOP`, or a candidate without text is an [`CheckError::UpstreamRefusal`].
pub fn extract_reply_text(response: GenerateResponse) -> Result<String, CheckError> {
    let candidate = match response.candidates.and_then(|c| c.into_iter().next()) {
        Some(candidate) => candidate,
        None => {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!("Request blocked before generation: {}", r))
                .unwrap_or_else(|| "The model returned no candidates.".to_string());
            return Err(CheckError::UpstreamRefusal(reason));
        }
    };

    match candidate.finish_reason.as_deref() {
        None | Some("STOP") => {}
        Some("SAFETY") => {
            let category = candidate
                .safety_ratings
                .iter()
                .find(|r| r.blocked)
                .map(|r| r.category.as_str())
                .unwrap_or("Unknown");
            return Err(CheckError::UpstreamRefusal(format!(
                "Correction stopped due to safety concerns ({}).",
                category
            )));
        }
        Some(other) => {
            return Err(CheckError::UpstreamRefusal(format!(
                "Correction stopped unexpectedly ({}).",
                other
            )));
        }
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(CheckError::UpstreamRefusal(
            "The model returned an empty reply.".to_string(),
        ));
    }
    Ok(text)
}

/// Build a reqwest client with the configured timeout.
fn build_api_client(timeout_secs: u64) -> Result<reqwest::Client, CheckError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CheckError::Transport(format!("Failed to build HTTP client: {}", e)))
}

/// Send one prompt and return the raw reply text.
pub async fn generate(
    endpoint: &EndpointConfig,
    model: &str,
    api_key: &str,
    prompt: &Prompt,
) -> Result<String, CheckError> {
    let client = build_api_client(endpoint.timeout_secs)?;
    let payload = build_request(prompt);
    let url = target_url(&endpoint.api_base, model, api_key);

    info!(
        "Sending correction request: model='{}' transport={:?} contract={:?}",
        model, endpoint.transport, prompt.contract
    );
    debug!("Prompt length: {} chars", prompt.text.chars().count());

    let request = match endpoint.transport {
        Transport::Direct => client.post(&url).json(&payload),
        Transport::Proxy => {
            let proxy_url = endpoint.proxy_url.as_deref().ok_or_else(|| {
                CheckError::Config("Proxy transport selected but no proxy_url set".to_string())
            })?;
            client.post(proxy_url).json(&ProxyRequest {
                endpoint: url,
                payload: &payload,
            })
        }
    };

    let response = request.send().await.map_err(|e| {
        let msg = if e.is_timeout() {
            format!("LLM API timeout after {}s", endpoint.timeout_secs)
        } else if e.is_connect() {
            "Could not reach the correction service. Please check your connection.".to_string()
        } else {
            format!("LLM API request failed: {}", e.without_url())
        };
        error!("{}", msg);
        CheckError::Transport(msg)
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        CheckError::Transport(format!("Failed to read API response body: {}", e.without_url()))
    })?;

    if !status.is_success() {
        let err = classify_http_error(status.as_u16(), &body);
        error!("LLM API error {}: {}", status, err);
        return Err(err);
    }

    let decoded: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
        error!("Unexpected API response structure: {}", e);
        CheckError::Transport(format!("Could not read API response: {}", e))
    })?;

    let text = extract_reply_text(decoded)?;
    info!("Received reply: {} chars", text.chars().count());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::prompt::build_prompt;
    use crate::checker::types::CorrectionOptions;

    fn decode(json: serde_json::Value) -> GenerateResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_target_url() {
        assert_eq!(
            target_url("https://generativelanguage.googleapis.com/v1beta/models/", "gemini-2.0-flash", "k"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key=k"
        );
    }

    #[test]
    fn test_request_shape_plain() {
        let prompt = build_prompt("teh", &CorrectionOptions::default(), OutputContract::Delimited);
        let json = serde_json::to_value(build_request(&prompt)).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], prompt.text.as_str());
        assert_eq!(json["generationConfig"]["responseMimeType"], "text/plain");
        assert!(json["generationConfig"].get("responseSchema").is_none());
        assert_eq!(json["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(json["safetySettings"][0]["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
    }

    #[test]
    fn test_request_shape_structured() {
        let options = CorrectionOptions {
            explain: true,
            ..Default::default()
        };
        let prompt = build_prompt("teh", &options, OutputContract::Structured);
        let json = serde_json::to_value(build_request(&prompt)).unwrap();
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["responseSchema"]["type"], "object");
    }

    #[test]
    fn test_proxy_body_flattens_payload() {
        let prompt = build_prompt("teh", &CorrectionOptions::default(), OutputContract::Delimited);
        let payload = build_request(&prompt);
        let body = serde_json::to_value(ProxyRequest {
            endpoint: "https://example.test/m:generateContent?key=k".to_string(),
            payload: &payload,
        })
        .unwrap();
        assert_eq!(body["endpoint"], "https://example.test/m:generateContent?key=k");
        assert!(body["contents"].is_array());
        assert!(body["generationConfig"].is_object());
    }

    #[test]
    fn test_extract_text() {
        let resp = decode(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "Hello "}, {"text": "world."}]},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(extract_reply_text(resp).unwrap(), "Hello world.");
    }

    #[test]
    fn test_extract_safety_stop_reports_category() {
        let resp = decode(serde_json::json!({
            "candidates": [{
                "finishReason": "SAFETY",
                "safetyRatings": [
                    {"category": "HARM_CATEGORY_HARASSMENT", "probability": "LOW"},
                    {"category": "HARM_CATEGORY_HATE_SPEECH", "probability": "HIGH", "blocked": true}
                ]
            }]
        }));
        let err = extract_reply_text(resp).unwrap_err();
        assert_eq!(
            err,
            CheckError::UpstreamRefusal(
                "Correction stopped due to safety concerns (HARM_CATEGORY_HATE_SPEECH).".to_string()
            )
        );
    }

    #[test]
    fn test_extract_truncated_is_refusal() {
        let resp = decode(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "Half a sent"}]},
                "finishReason": "MAX_TOKENS"
            }]
        }));
        assert!(matches!(
            extract_reply_text(resp),
            Err(CheckError::UpstreamRefusal(msg)) if msg.contains("MAX_TOKENS")
        ));
    }

    #[test]
    fn test_extract_prompt_block() {
        let resp = decode(serde_json::json!({
            "promptFeedback": {"blockReason": "OTHER"}
        }));
        assert_eq!(
            extract_reply_text(resp).unwrap_err(),
            CheckError::UpstreamRefusal("Request blocked before generation: OTHER".to_string())
        );
    }

    #[test]
    fn test_extract_empty_candidates() {
        let resp = decode(serde_json::json!({"candidates": []}));
        assert!(matches!(extract_reply_text(resp), Err(CheckError::UpstreamRefusal(_))));
    }

    #[test]
    fn test_extract_empty_text_is_refusal() {
        let resp = decode(serde_json::json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "STOP"}]
        }));
        assert!(matches!(extract_reply_text(resp), Err(CheckError::UpstreamRefusal(_))));
    }

    #[test]
    fn test_classify_http_errors() {
        let invalid_key = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(
            classify_http_error(400, invalid_key),
            CheckError::Transport("Invalid Google AI API Key provided.".to_string())
        );

        let safety = r#"{"error": {"message": "The request is triggering safety filters"}}"#;
        assert!(matches!(classify_http_error(400, safety), CheckError::UpstreamRefusal(_)));

        assert_eq!(
            classify_http_error(429, "{}"),
            CheckError::Transport("API Rate Limit Exceeded.".to_string())
        );
        assert_eq!(
            classify_http_error(502, "<html>bad gateway</html>"),
            CheckError::Transport("Proxy or Google AI Service Error.".to_string())
        );
        assert_eq!(
            classify_http_error(404, r#"{"message": "model not found"}"#),
            CheckError::Transport("Error (404): model not found".to_string())
        );
    }
}
