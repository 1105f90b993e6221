use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::AiConfig;
use crate::errors::LlmError;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Returned instead of a generated report when no API key is configured.
pub const DEMO_RESPONSE: &str = "API 키가 설정되지 않아 데모 분석만 가능합니다. (실제 분석 아님)";

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate_completion(&self, prompt: String) -> Result<String, LlmError>;
}

/// Gemini generateContent request/response structures
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate.
    fn text(self) -> Result<String, LlmError> {
        let content = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| LlmError::InvalidResponse("No candidates in response".to_string()))?;

        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        if text.trim().is_empty() {
            return Err(LlmError::InvalidResponse("Empty candidate text".to_string()));
        }
        Ok(text)
    }
}

/// Google Generative Language API provider
pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        Ok(Self {
            api_key,
            model,
            client,
        })
    }

    async fn call_gemini(&self, request: &GeminiRequest) -> Result<GeminiResponse, LlmError> {
        let response = self
            .client
            .post(format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 429 {
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::ApiError(format!("HTTP {}: {}", status, error_text)));
        }

        response
            .json::<GeminiResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate_completion(&self, prompt: String) -> Result<String, LlmError> {
        info!("Generating LLM completion (model: {}, prompt: {} chars)", self.model, prompt.len());

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let response = self.call_gemini(&request).await?;
        if let Some(usage) = &response.usage_metadata {
            info!(
                "LLM completion generated. Tokens: {} prompt + {} completion",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        response.text()
    }
}

/// Entry point for text generation. Without a configured key every call
/// answers with [`DEMO_RESPONSE`].
#[derive(Clone)]
pub struct LlmService {
    provider: Option<Arc<dyn LlmProvider>>,
}

impl LlmService {
    pub fn new(config: &AiConfig) -> Self {
        let provider = match &config.api_key {
            Some(api_key) => match GeminiProvider::new(api_key.clone(), config.model.clone()) {
                Ok(provider) => {
                    info!("Initializing LLM service with model: {}", config.model);
                    Some(Arc::new(provider) as Arc<dyn LlmProvider>)
                }
                Err(e) => {
                    error!("Failed to build Gemini client: {}. LLM features disabled.", e);
                    None
                }
            },
            None => {
                warn!("GEMINI_API_KEY not configured. LLM features disabled.");
                None
            }
        };

        Self { provider }
    }

    pub fn with_provider(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn generate_completion(&self, prompt: String) -> Result<String, LlmError> {
        match &self.provider {
            Some(provider) => provider.generate_completion(prompt).await,
            None => {
                warn!("LLM request without API key, returning demo text");
                Ok(DEMO_RESPONSE.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl LlmProvider for Echo {
        async fn generate_completion(&self, prompt: String) -> Result<String, LlmError> {
            Ok(format!("echo: {}", prompt))
        }
    }

    #[test]
    fn test_llm_service_disabled_without_key() {
        let service = LlmService::new(&AiConfig::default());
        assert!(!service.is_enabled());
    }

    #[tokio::test]
    async fn test_disabled_service_returns_demo_text() {
        let service = LlmService::new(&AiConfig::default());
        let result = service.generate_completion("test".to_string()).await.unwrap();
        assert_eq!(result, DEMO_RESPONSE);
    }

    #[tokio::test]
    async fn test_service_delegates_to_provider() {
        let service = LlmService::with_provider(Arc::new(Echo));
        let result = service.generate_completion("hi".to_string()).await.unwrap();
        assert_eq!(result, "echo: hi");
    }

    #[test]
    fn test_extracts_first_candidate_text() {
        let body = r#"{
            "candidates": [{"content": {"parts": [{"text": "안녕"}, {"text": "하세요"}], "role": "model"}}],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 3}
        }"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.text().unwrap(), "안녕하세요");
    }

    #[test]
    fn test_blocked_response_is_invalid() {
        let response: GeminiResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(matches!(response.text(), Err(LlmError::InvalidResponse(_))));
    }
}
