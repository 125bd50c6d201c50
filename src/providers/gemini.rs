use std::time::Duration;
use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use reqwest::Client;
use url::Url;
use log::{debug, error};

use crate::errors::ProviderError;
use super::{ChatBackend, ChatReply, ChatSession, ChatTurn, GenerationParams, Role, SafetySetting, SessionParams};

/// Default public endpoint of the Generative Language API
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Default model name
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Gemini client for interacting with the Generative Language API
#[derive(Clone)]
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// API key bound by `configure`
    api_key: String,
    /// Fully resolved `generateContent` URL
    generate_url: Url,
}

/// Conversation held client-side and replayed on every request
pub struct GeminiSession {
    client: Client,
    api_key: String,
    generate_url: Url,
    params: SessionParams,
    history: Vec<ChatTurn>,
}

/// generateContent request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// The conversation so far, ending with the new user message
    contents: Vec<GeminiContent>,

    /// Sampling parameters
    generation_config: GeminiGenerationConfig,

    /// Content filter thresholds
    safety_settings: Vec<SafetySetting>,
}

/// One turn of conversation
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    /// "user" or "model"
    #[serde(default)]
    pub role: Option<String>,

    /// Text parts of the turn
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// Text part of a turn
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: String,
}

/// Sampling parameters in the API's naming
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

impl From<&GenerationParams> for GeminiGenerationConfig {
    fn from(params: &GenerationParams) -> Self {
        Self {
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            max_output_tokens: params.max_output_tokens,
        }
    }
}

/// generateContent response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidate completions
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,

    /// Token usage information
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

/// Single candidate completion
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
}

/// Error envelope returned with non-2xx statuses
#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl Gemini {
    /// Create a new Gemini client for `model` at `endpoint`
    pub fn new(model: &str, endpoint: &str, timeout_secs: u64) -> Result<Self, ProviderError> {
        let base = if endpoint.trim().is_empty() { DEFAULT_ENDPOINT } else { endpoint.trim() };
        let base = Url::parse(&format!("{}/", base.trim_end_matches('/')))
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid endpoint '{}': {}", endpoint, e)))?;
        let generate_url = base
            .join(&format!("v1beta/models/{}:generateContent", model))
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid model name '{}': {}", model, e)))?;

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: String::new(),
            generate_url,
        })
    }

    /// URL requests are posted to
    pub fn generate_url(&self) -> &Url {
        &self.generate_url
    }

    /// Extract the reply text from the first candidate of a response
    pub fn extract_text_from_response(response: &GenerateContentResponse) -> String {
        response.candidates.first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|content| content.parts.iter())
            .map(|part| part.text.as_str())
            .collect()
    }
}

impl ChatBackend for Gemini {
    type Session = GeminiSession;

    fn configure(&mut self, credential: &str) {
        self.api_key = credential.to_string();
    }

    fn start_session(&self, params: &SessionParams, history: Vec<ChatTurn>) -> GeminiSession {
        GeminiSession {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            generate_url: self.generate_url.clone(),
            params: params.clone(),
            history,
        }
    }
}

impl GeminiSession {
    fn build_request(&self, message: &str) -> GenerateContentRequest {
        let contents = self.history.iter()
            .chain(std::iter::once(&ChatTurn::user(message)))
            .map(|turn| GeminiContent {
                role: Some(match turn.role {
                    Role::User => "user".to_string(),
                    Role::Model => "model".to_string(),
                }),
                parts: vec![GeminiPart { text: turn.text.clone() }],
            })
            .collect();

        GenerateContentRequest {
            contents,
            generation_config: (&self.params.generation).into(),
            safety_settings: self.params.safety_settings.clone(),
        }
    }
}

#[async_trait]
impl ChatSession for GeminiSession {
    async fn send(&mut self, message: &str) -> Result<ChatReply, ProviderError> {
        let request = self.build_request(message);

        let response = self.client.post(self.generate_url.clone())
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            let err = classify_error(status.as_u16(), &error_text);
            if !err.is_quota_exhausted() {
                error!("Gemini API error ({}): {}", status, error_text);
            }
            return Err(err);
        }

        let body = response.json::<GenerateContentResponse>().await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        if let Some(usage) = &body.usage_metadata {
            debug!("Gemini usage: {} prompt / {} completion tokens", usage.prompt_token_count, usage.candidates_token_count);
        }

        let text = Gemini::extract_text_from_response(&body);
        self.history.push(ChatTurn::user(message));
        self.history.push(ChatTurn::model(text.clone()));

        Ok(ChatReply { text })
    }

    fn history(&self) -> &[ChatTurn] {
        &self.history
    }
}

/// Map a non-success status and body to a provider error
pub fn classify_error(status_code: u16, body: &str) -> ProviderError {
    let parsed = serde_json::from_str::<GeminiErrorEnvelope>(body).ok();
    let message = parsed.as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());
    let api_status = parsed.as_ref().map(|e| e.error.status.as_str()).unwrap_or("");

    if status_code == 429 || api_status == "RESOURCE_EXHAUSTED" {
        ProviderError::QuotaExhausted(message)
    } else if status_code == 401 || status_code == 403 || api_status == "UNAUTHENTICATED" || api_status == "PERMISSION_DENIED" {
        ProviderError::AuthenticationError(message)
    } else {
        ProviderError::ApiError { status_code, message }
    }
}
