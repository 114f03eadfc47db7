//! Generation Service Abstraction
//!
//! The engine treats text generation as an opaque request/response capability:
//! a model id, a prompt, and an optional output contract go in; free text or a
//! structured payload comes out. Concrete HTTP clients (Gemini, OpenAI-compatible)
//! and a scripted stub implement the same trait so every orchestration component
//! can be driven without a network.

use crate::error::GenerationError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub mod contract;
pub mod generator;
pub mod stub;

pub use contract::{Contract, OutputContract};
pub use generator::{CallPolicy, Generator};
pub use stub::StubService;

/// One call to the Generation Service
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub contract: Option<OutputContract>,
}

impl GenerationRequest {
    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            contract: None,
        }
    }

    pub fn structured(
        model: impl Into<String>,
        prompt: impl Into<String>,
        contract: OutputContract,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            contract: Some(contract),
        }
    }
}

/// Response body returned by the Generation Service
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Structured(Value),
}

impl Payload {
    /// Free-text view of the payload. Structured payloads are rendered as compact JSON.
    pub fn into_text(self) -> String {
        match self {
            Payload::Text(text) => text,
            Payload::Structured(value) => match value {
                Value::String(text) => text,
                other => other.to_string(),
            },
        }
    }

    /// JSON view of the payload, parsing text responses that carry a JSON document.
    pub fn into_value(self, contract: &str) -> Result<Value, GenerationError> {
        match self {
            Payload::Structured(value) => Ok(value),
            Payload::Text(text) => {
                serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
                    GenerationError::SchemaValidation {
                        contract: contract.to_string(),
                        message: format!("response is not valid JSON: {}", e),
                    }
                })
            }
        }
    }
}

/// Models sometimes wrap JSON in a markdown fence even when asked not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.strip_prefix("json").unwrap_or(rest);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Generation Service trait
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Issue one generation call
    async fn generate(&self, request: GenerationRequest) -> Result<Payload, GenerationError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}

/// Which backend a configured provider talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    OpenAI,
    /// Scripted offline service; needs no credentials
    Stub,
}

/// Provider configuration (`[provider]` table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_kind")]
    pub kind: ProviderKind,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL override (proxies, Azure, local gateways)
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_kind() -> ProviderKind {
    ProviderKind::Gemini
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            endpoint: None,
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model cannot be empty".to_string());
        }
        if self.kind != ProviderKind::Stub && self.api_key_env.trim().is_empty() {
            return Err("api_key_env cannot be empty".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!("Invalid endpoint URL: {}", endpoint));
            }
        }
        Ok(())
    }
}

/// Process-wide secret, read once at startup and never reloaded.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Read the API key from the named environment variable
    pub fn from_env(var: &str) -> Result<Self, GenerationError> {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Ok(Self::new(value.trim())),
            _ => Err(GenerationError::NotConfigured(format!(
                "environment variable {} is not set",
                var
            ))),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credentials(***)")
    }
}

// Helper function to map transport errors to GenerationError
fn map_http_error(error: reqwest::Error) -> GenerationError {
    if let Some(status) = error.status() {
        map_status(status.as_u16(), &error.to_string())
    } else if error.is_timeout() {
        GenerationError::RequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        GenerationError::RequestFailed(format!("Connection error: {}", error))
    } else {
        GenerationError::RequestFailed(format!("HTTP error: {}", error))
    }
}

fn map_status(status: u16, body: &str) -> GenerationError {
    match status {
        401 | 403 => GenerationError::AuthFailed(format!("Authentication failed: {}", body)),
        429 => GenerationError::RateLimited(format!("Rate limit exceeded: {}", body)),
        404 => GenerationError::ModelNotFound(format!("Model not found: {}", body)),
        _ => GenerationError::RequestFailed(format!(
            "Request failed with status {}: {}",
            status, body
        )),
    }
}

async fn error_for_response(response: reqwest::Response) -> GenerationError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    map_status(status, &body)
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// Whole-call timeouts belong to CallPolicy, so the client only bounds connection setup.
fn build_provider_http_client() -> Result<Client, GenerationError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .build()
        .map_err(|e| GenerationError::NotConfigured(format!("Failed to create HTTP client: {}", e)))
}

/// Google Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    credentials: Credentials,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        credentials: Credentials,
        base_url: Option<String>,
    ) -> Result<Self, GenerationError> {
        let client = build_provider_http_client()?;
        let base_url = base_url
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string());
        Ok(Self {
            client,
            credentials,
            base_url,
        })
    }

    fn request_body(request: &GenerationRequest) -> Value {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
        });
        if let Some(contract) = &request.contract {
            body["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseJsonSchema": contract.schema,
            });
        }
        body
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<Payload, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.credentials.api_key)
            .json(&Self::request_body(&request))
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }

        #[derive(Deserialize)]
        struct GeminiResponse {
            #[serde(default)]
            candidates: Vec<GeminiCandidate>,
        }

        #[derive(Deserialize)]
        struct GeminiCandidate {
            content: Option<GeminiContent>,
        }

        #[derive(Deserialize)]
        struct GeminiContent {
            #[serde(default)]
            parts: Vec<GeminiPart>,
        }

        #[derive(Deserialize)]
        struct GeminiPart {
            #[serde(default)]
            text: String,
        }

        let completion: GeminiResponse = response.json().await.map_err(|e| {
            GenerationError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        let text: String = completion
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| GenerationError::InvalidResponse("No candidates in response".into()))?
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();

        match &request.contract {
            Some(contract) => Payload::Text(text)
                .into_value(&contract.name)
                .map(Payload::Structured),
            None => Ok(Payload::Text(text)),
        }
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}

// OpenAI-compatible API request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: OpenAIMessage,
}

/// OpenAI-compatible chat completions client
pub struct OpenAIClient {
    client: Client,
    credentials: Credentials,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(
        credentials: Credentials,
        base_url: Option<String>,
    ) -> Result<Self, GenerationError> {
        let client = build_provider_http_client()?;
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        Ok(Self {
            client,
            credentials,
            base_url,
        })
    }
}

#[async_trait]
impl GenerationService for OpenAIClient {
    async fn generate(&self, request: GenerationRequest) -> Result<Payload, GenerationError> {
        let response_format = request.contract.as_ref().map(|contract| {
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": contract.name,
                    "schema": contract.schema,
                },
            })
        });
        let body = ChatCompletionRequest {
            model: request.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            response_format,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.credentials.api_key),
            )
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            GenerationError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("No choices in response".into()))?;

        match &request.contract {
            Some(contract) => Payload::Text(content)
                .into_value(&contract.name)
                .map(Payload::Structured),
            None => Ok(Payload::Text(content)),
        }
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

/// Provider factory for creating Generation Service clients
pub struct ProviderFactory;

impl ProviderFactory {
    /// Build the configured service. Remote kinds require credentials read at startup.
    pub fn create_service(
        config: &ProviderConfig,
        credentials: Option<Credentials>,
    ) -> Result<Arc<dyn GenerationService>, GenerationError> {
        let require = |credentials: Option<Credentials>| {
            credentials.ok_or_else(|| {
                GenerationError::NotConfigured(format!(
                    "{:?} provider requires an API key in {}",
                    config.kind, config.api_key_env
                ))
            })
        };
        match config.kind {
            ProviderKind::Gemini => Ok(Arc::new(GeminiClient::new(
                require(credentials)?,
                config.endpoint.clone(),
            )?)),
            ProviderKind::OpenAI => Ok(Arc::new(OpenAIClient::new(
                require(credentials)?,
                config.endpoint.clone(),
            )?)),
            ProviderKind::Stub => Ok(Arc::new(StubService::offline_demo())),
        }
    }
}
