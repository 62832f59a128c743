#![deny(missing_docs)]
//! A reference [`argo_types::Provider`] implementation against any
//! OpenAI-compatible chat completion endpoint.
//!
//! Grounded in this corpus's `neuron-provider-openai`, stripped down to the
//! single-shot, non-streaming, non-structured-tool-call surface the core
//! actually needs: the core never sends a tool schema over the wire, so
//! there is no `tools`/`tool_calls` mapping here, only `messages` in and a
//! raw text choice out.

mod types;

use std::time::Duration;

use argo_types::{CompletionRequest, CompletionResponse, Provider, ProviderError};
use async_trait::async_trait;
use types::{OpenAiChoice, OpenAiMessage, OpenAiRequest, OpenAiResponse};

/// An OpenAI-compatible chat completion endpoint (OpenAI itself, or any
/// local server that speaks the same wire format — Ollama's `/v1` shim,
/// vLLM, LM Studio, ...).
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatProvider {
    /// Construct a provider against OpenAI's own endpoint, authenticated
    /// with `api_key`.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: Some(api_key.into()),
        }
    }

    /// Point at a local OpenAI-compatible server (Ollama, vLLM, ...) that
    /// needs no bearer token.
    #[must_use]
    pub fn local(api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: None,
        }
    }

    /// Override the endpoint URL (proxies, self-hosted gateways, tests).
    #[must_use]
    pub fn with_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn build_request(&self, request: &CompletionRequest) -> OpenAiRequest {
        let messages = request
            .messages
            .iter()
            .map(|m| OpenAiMessage {
                role: m.role.clone(),
                content: m.content.clone(),
            })
            .collect();
        OpenAiRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stop: if request.stop.is_empty() {
                None
            } else {
                Some(request.stop.clone())
            },
        }
    }

    fn parse_response(response: OpenAiResponse) -> Result<CompletionResponse, ProviderError> {
        let choice: OpenAiChoice = response.choices.into_iter().next().ok_or_else(|| {
            ProviderError::InvalidRequest("response contained no choices".to_string())
        })?;
        Ok(CompletionResponse {
            text: choice.message.content,
        })
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let body = self.build_request(&request);
        let mut http_request = self.client.post(&self.api_url).json(&body);
        if let Some(api_key) = &self.api_key {
            http_request = http_request.header("authorization", format!("Bearer {api_key}"));
        }

        let http_response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(Duration::from_secs(0))
            } else {
                ProviderError::Network(Box::new(e))
            }
        })?;

        let status = http_response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = http_response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimit { retry_after });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = http_response.text().await.unwrap_or_default();
            return Err(ProviderError::Authentication(body));
        }
        if status.is_server_error() {
            let body = http_response.text().await.unwrap_or_default();
            return Err(ProviderError::ServiceUnavailable(format!(
                "HTTP {status}: {body}"
            )));
        }
        if !status.is_success() {
            let body = http_response.text().await.unwrap_or_default();
            return Err(ProviderError::InvalidRequest(format!(
                "HTTP {status}: {body}"
            )));
        }

        let parsed: OpenAiResponse = http_response
            .json()
            .await
            .map_err(|e| ProviderError::Other(Box::new(e)))?;
        Self::parse_response(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argo_types::WireMessage;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![
                WireMessage::system("Be helpful."),
                WireMessage::user("Hello"),
            ],
            temperature: 0.3,
            max_tokens: 1024,
            stop: vec![],
        }
    }

    #[test]
    fn build_request_carries_model_and_messages() {
        let provider = OpenAiCompatProvider::new("sk-test");
        let body = provider.build_request(&request());
        assert_eq!(body.model, "gpt-4o-mini");
        assert_eq!(body.messages.len(), 2);
        assert_eq!(body.messages[0].role, "system");
        assert_eq!(body.messages[1].content, "Hello");
        assert!(body.stop.is_none());
    }

    #[test]
    fn empty_stop_list_is_omitted_not_empty_array() {
        let provider = OpenAiCompatProvider::new("sk-test");
        let body = provider.build_request(&request());
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("stop").is_none());
    }

    #[test]
    fn non_empty_stop_list_is_carried() {
        let provider = OpenAiCompatProvider::new("sk-test");
        let mut req = request();
        req.stop = vec!["END".to_string()];
        let body = provider.build_request(&req);
        assert_eq!(body.stop, Some(vec!["END".to_string()]));
    }

    #[test]
    fn parse_response_extracts_first_choice_text() {
        let response = OpenAiResponse {
            choices: vec![OpenAiChoice {
                message: OpenAiMessage {
                    role: "assistant".to_string(),
                    content: "Hi there!".to_string(),
                },
            }],
        };
        let parsed = OpenAiCompatProvider::parse_response(response).unwrap();
        assert_eq!(parsed.text, "Hi there!");
    }

    #[test]
    fn parse_response_rejects_empty_choices() {
        let response = OpenAiResponse { choices: vec![] };
        let err = OpenAiCompatProvider::parse_response(response).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }

    #[test]
    fn local_provider_has_no_bearer_token() {
        let provider = OpenAiCompatProvider::local("http://localhost:11434/v1/chat/completions");
        assert!(provider.api_key.is_none());
        assert_eq!(provider.api_url, "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn with_url_overrides_endpoint() {
        let provider = OpenAiCompatProvider::new("sk-test").with_url("http://proxy/v1/chat");
        assert_eq!(provider.api_url, "http://proxy/v1/chat");
    }
}
