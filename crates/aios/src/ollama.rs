//! Inference client - a single blocking POST to the local Ollama generate
//! endpoint per classification.

use crate::error::ActionError;
use crate::parser::json_escape;
use async_trait::async_trait;
use tracing::debug;

/// The classification backend seam. Injected so tests can script replies.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Send one prompt, return the raw response body. The caller extracts
    /// the envelope's `response` field; any shape problem degrades to "no
    /// classification" there, not here.
    async fn generate(&self, prompt: &str) -> Result<String, ActionError>;
}

/// InferenceClient over the Ollama HTTP API.
pub struct OllamaClient {
    url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(url: String, model: String) -> Self {
        // No request timeout: a hung backend freezes the turn. Known gap,
        // the call has no cancellation path either.
        Self {
            url,
            model,
            client: reqwest::Client::new(),
        }
    }

    fn payload(&self, prompt: &str) -> String {
        format!(
            "{{\"model\": \"{}\", \"prompt\": \"{}\", \"stream\": false}}",
            self.model,
            json_escape(prompt)
        )
    }
}

#[async_trait]
impl InferenceClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, ActionError> {
        let body = self.payload(prompt);
        debug!("POST {} ({} bytes)", self.url, body.len());

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ActionError::Inference(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ActionError::Inference(format!(
                "backend returned {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ActionError::Inference(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_shape_and_escaping() {
        let client = OllamaClient::new(
            "http://localhost:11434/api/generate".to_string(),
            "qwen2.5-coder:1.5b".to_string(),
        );
        let payload = client.payload("say \"hi\"\nplease");
        assert_eq!(
            payload,
            "{\"model\": \"qwen2.5-coder:1.5b\", \"prompt\": \"say \\\"hi\\\" please\", \"stream\": false}"
        );
    }
}
