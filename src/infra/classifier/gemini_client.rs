// =============================================================================
// GEMINI CLASSIFIER - Google AI Studio API Integration
// =============================================================================
//
// Implements `SemanticClassifier` on top of the Gemini generateContent
// endpoint (https://ai.google.dev/api/generate-content).
//
// - Authentication: API key is passed as a query parameter (`?key=API_KEY`).
// - Request format: a single user turn in `contents[]` with one text part.
// - Response format: the reply is the text of the last part of the first
//   candidate.

use crate::core::moderation::{classification_prompt, ClassifierError, SemanticClassifier};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Room for the one-word answer plus the smallest thinking budget a
/// thinking-only model accepts.
const MAX_OUTPUT_TOKENS: u32 = 512;

/// Smallest budget accepted by models that cannot turn thinking off (2.5 Pro).
const MIN_PRO_THINKING_BUDGET: i32 = 128;

/// A single part of content. Only text parts matter for classification.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct Content {
    /// "user" on requests, "model" on responses.
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,

    /// Only sent to models that think (Gemini 2.5+).
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

/// On 2.5+ models thinking tokens are billed against `maxOutputTokens`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    include_thoughts: bool,
    thinking_budget: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,

    /// Why the model stopped generating (e.g., "STOP", "MAX_TOKENS").
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

/// Semantic classifier backed by Google's Gemini API.
pub struct GeminiClassifier {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClassifier {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, self.api_key
        )
    }

    /// Thinking is switched off where the model allows it, and kept to the
    /// minimum where it doesn't.
    fn thinking_config(&self) -> Option<ThinkingConfig> {
        let model = self.model.to_lowercase();
        let supports_thinking = model.contains("2.5") || model.contains("gemini-3");
        if !supports_thinking {
            return None;
        }

        let thinking_budget = if model.contains("pro") {
            MIN_PRO_THINKING_BUDGET
        } else {
            0
        };
        Some(ThinkingConfig {
            include_thoughts: false,
            thinking_budget,
        })
    }

    fn build_request(&self, text: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: Some(classification_prompt(text)),
                }],
            }],
            // The answer is a single word; keep it deterministic and short
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens: MAX_OUTPUT_TOKENS,
                thinking_config: self.thinking_config(),
            },
        }
    }

    fn extract_text(response: GenerateContentResponse) -> Result<String, ClassifierError> {
        let candidate = response
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| {
                ClassifierError::MalformedResponse(
                    "No candidates in Gemini response - the prompt may have been blocked".to_string(),
                )
            })?;

        let finish_reason = candidate.finish_reason;

        // Thinking models may emit several parts; the answer comes last
        let text = candidate
            .content
            .parts
            .into_iter()
            .rev()
            .find_map(|p| p.text);

        match (text, finish_reason.as_deref()) {
            (Some(text), _) => Ok(text),
            (None, Some("MAX_TOKENS")) => {
                tracing::warn!(
                    max_output_tokens = MAX_OUTPUT_TOKENS,
                    "Gemini reply truncated before any answer text (finishReason MAX_TOKENS)"
                );
                Err(ClassifierError::MalformedResponse(
                    "Gemini reply truncated (MAX_TOKENS) before any text".to_string(),
                ))
            }
            (None, reason) => Err(ClassifierError::MalformedResponse(format!(
                "Gemini reply had no text (finishReason: {})",
                reason.unwrap_or("unknown")
            ))),
        }
    }
}

#[async_trait]
impl SemanticClassifier for GeminiClassifier {
    async fn classify_offensive(&self, text: &str) -> Result<String, ClassifierError> {
        let request = self.build_request(text);

        tracing::debug!("Gemini classification request to model {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .map_err(|e| ClassifierError::Transport(e.to_string()))?;

            if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(&error_text) {
                return Err(ClassifierError::Transport(format!(
                    "Gemini API error ({}): {}",
                    status, error_response.error.message
                )));
            }

            return Err(ClassifierError::Transport(format!(
                "Gemini API error: {} - {}",
                status, error_text
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;

        Self::extract_text(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(model: &str) -> GeminiClassifier {
        GeminiClassifier::new("key".to_string(), model.to_string())
    }

    #[test]
    fn test_request_serialization() {
        let request = classifier("gemini-2.5-flash").build_request("hello there");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        let prompt = json["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("hello there"));
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 512);
    }

    #[test]
    fn test_thinking_disabled_for_flash() {
        let request = classifier("gemini-2.5-flash").build_request("x");
        let json = serde_json::to_value(&request).unwrap();

        let thinking = &json["generationConfig"]["thinkingConfig"];
        assert_eq!(thinking["thinkingBudget"], 0);
        assert_eq!(thinking["includeThoughts"], false);
    }

    #[test]
    fn test_pro_keeps_minimum_thinking_budget() {
        let request = classifier("gemini-2.5-pro").build_request("x");
        let json = serde_json::to_value(&request).unwrap();

        let budget = json["generationConfig"]["thinkingConfig"]["thinkingBudget"]
            .as_i64()
            .unwrap();
        assert_eq!(budget, 128);
        let cap = json["generationConfig"]["maxOutputTokens"].as_i64().unwrap();
        assert!(cap > budget);
    }

    #[test]
    fn test_older_models_get_no_thinking_config() {
        let request = classifier("gemini-2.0-flash").build_request("x");
        let json = serde_json::to_value(&request).unwrap();

        assert!(json["generationConfig"].get("thinkingConfig").is_none());
    }

    #[test]
    fn test_max_tokens_without_text_is_reported_as_truncation() {
        let body: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model"},"finishReason":"MAX_TOKENS"}]}"#,
        )
        .unwrap();

        match GeminiClassifier::extract_text(body) {
            Err(ClassifierError::MalformedResponse(msg)) => assert!(msg.contains("MAX_TOKENS")),
            other => panic!("expected truncation error, got {:?}", other),
        }
    }

    #[test]
    fn test_endpoint_includes_model_and_key() {
        let client = GeminiClassifier::new("secret".to_string(), "gemini-2.5-flash".to_string());
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent?key=secret"
        );
    }

    #[test]
    fn test_extract_last_text_part() {
        let body: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"thinking..."},{"text":"idiot"}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();

        assert_eq!(GeminiClassifier::extract_text(body).unwrap(), "idiot");
    }

    #[test]
    fn test_missing_candidates_is_malformed() {
        let body: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();

        assert!(matches!(
            GeminiClassifier::extract_text(body),
            Err(ClassifierError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_error_body_parses() {
        let err: GeminiErrorResponse =
            serde_json::from_str(r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#)
                .unwrap();
        assert_eq!(err.error.message, "API key not valid");
    }
}
