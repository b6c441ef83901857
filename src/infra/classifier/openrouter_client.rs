use crate::core::moderation::{classification_prompt, ClassifierError, SemanticClassifier};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Semantic classifier backed by any chat model reachable through OpenRouter.
pub struct OpenRouterClassifier {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenRouterClassifier {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    fn payload(&self, text: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": classification_prompt(text) }
            ],
            "temperature": 0.0,
            "max_tokens": 32,
        })
    }

    fn extract_content(response_json: &Value) -> Result<String, ClassifierError> {
        response_json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ClassifierError::MalformedResponse("Failed to parse response content".to_string())
            })
    }
}

#[async_trait]
impl SemanticClassifier for OpenRouterClassifier {
    async fn classify_offensive(&self, text: &str) -> Result<String, ClassifierError> {
        let response = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.payload(text))
            .send()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Transport(format!(
                "OpenRouter API error: {} - {}",
                status, text
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;

        Self::extract_content(&response_json)
    }
}
