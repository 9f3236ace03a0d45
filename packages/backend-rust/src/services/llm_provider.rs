use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ADVENTURE_MODEL: &str = "gpt-4o";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_HEAVY_MODEL: &str = "llama3.2:8b";
const DEFAULT_LIGHT_MODEL: &str = "llama3.2:3b";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_RETRIES: usize = 3;
const BASE_BACKOFF_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

/// Which model a request should run on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// stories, comprehension, long structured output
    Heavy,
    /// word banks, hints
    Light,
    Adventure,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub openai_endpoint: String,
    pub openai_model: String,
    pub adventure_model: String,
    pub ollama_url: String,
    pub heavy_model: String,
    pub light_model: String,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let api_key = env_string("OPENAI_API_KEY");
        let kind = if api_key.is_some() {
            ProviderKind::OpenAi
        } else {
            ProviderKind::Ollama
        };
        Self {
            kind,
            api_key,
            openai_endpoint: normalize_endpoint(
                env_string("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string()),
            ),
            openai_model: env_string("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            adventure_model: env_string("ADVENTURE_AI_MODEL")
                .unwrap_or_else(|| DEFAULT_ADVENTURE_MODEL.to_string()),
            ollama_url: env_string("OLLAMA_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            heavy_model: env_string("OLLAMA_HEAVY_MODEL").unwrap_or_else(|| DEFAULT_HEAVY_MODEL.to_string()),
            light_model: env_string("OLLAMA_LIGHT_MODEL").unwrap_or_else(|| DEFAULT_LIGHT_MODEL.to_string()),
            timeout: Duration::from_secs(env_u64("OLLAMA_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

/// Result of the most recent provider probe
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AiStatus {
    pub status: String,
    pub provider: String,
    pub heavy_model: String,
    pub light_model: String,
    pub heavy_available: bool,
    pub light_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AiStatus {
    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}

/// Shared probe state; empty until the first probe.
#[derive(Debug, Default)]
pub struct LlmStatus {
    current: RwLock<Option<AiStatus>>,
}

impl LlmStatus {
    pub fn get(&self) -> Option<AiStatus> {
        self.current.read().clone()
    }

    pub fn set(&self, status: AiStatus) {
        *self.current.write() = Some(status);
    }

    pub fn reset(&self) {
        *self.current.write() = None;
    }

    pub fn is_ready(&self) -> bool {
        self.current.read().as_ref().is_some_and(AiStatus::is_ready)
    }

    fn model_available(&self, model: &str) -> bool {
        self.current.read().as_ref().is_some_and(|s| {
            s.is_ready()
                && ((s.heavy_available && s.heavy_model == model)
                    || (s.light_available && s.light_model == model))
        })
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM not available: {0}")]
    Unavailable(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyChoices,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

/// Options for one JSON completion
#[derive(Debug, Clone, Copy)]
pub struct JsonRequest<'a> {
    pub tier: ModelTier,
    pub system: Option<&'a str>,
    pub prompt: &'a str,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Clone)]
pub struct LlmProvider {
    config: Arc<LlmConfig>,
    client: reqwest::Client,
    status: Arc<LlmStatus>,
}

impl LlmProvider {
    pub fn from_env() -> Self {
        Self::new(LlmConfig::from_env())
    }

    pub fn new(config: LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout.max(Duration::from_secs(90)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config: Arc::new(config),
            client,
            status: Arc::new(LlmStatus::default()),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.config.kind
    }

    pub fn status(&self) -> Option<AiStatus> {
        self.status.get()
    }

    pub fn is_ready(&self) -> bool {
        self.status.is_ready()
    }

    pub fn reset(&self) {
        self.status.reset();
    }

    /// Checks provider availability and records the outcome.
    pub async fn probe(&self) -> AiStatus {
        let status = match self.config.kind {
            ProviderKind::OpenAi => self.openai_status(),
            ProviderKind::Ollama => self.probe_ollama().await,
        };
        match status.status.as_str() {
            "ready" => info!(
                provider = %status.provider,
                heavy = %status.heavy_model,
                light = %status.light_model,
                "AI content generation active"
            ),
            "models_missing" => warn!(
                heavy = %status.heavy_model,
                light = %status.light_model,
                "LLM provider reachable but models are missing"
            ),
            _ => warn!("no LLM available, using template content"),
        }
        self.status.set(status.clone());
        status
    }

    fn openai_status(&self) -> AiStatus {
        AiStatus {
            status: "ready".to_string(),
            provider: ProviderKind::OpenAi.as_str().to_string(),
            heavy_model: self.config.openai_model.clone(),
            light_model: self.config.openai_model.clone(),
            heavy_available: true,
            light_available: true,
            ollama_url: None,
            all_models: Vec::new(),
            error: None,
        }
    }

    async fn probe_ollama(&self) -> AiStatus {
        let cfg = &self.config;
        let url = format!("{}/api/tags", cfg.ollama_url);
        let mut status = AiStatus {
            status: "unavailable".to_string(),
            provider: ProviderKind::Ollama.as_str().to_string(),
            heavy_model: cfg.heavy_model.clone(),
            light_model: cfg.light_model.clone(),
            heavy_available: false,
            light_available: false,
            ollama_url: Some(cfg.ollama_url.clone()),
            all_models: Vec::new(),
            error: None,
        };

        let tags = async {
            let resp = self.client.get(&url).timeout(PROBE_TIMEOUT).send().await?;
            resp.error_for_status()?.json::<OllamaTags>().await
        }
        .await;

        match tags {
            Ok(tags) => {
                let mut names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
                names.sort();
                names.dedup();
                status.heavy_available = names.contains(&cfg.heavy_model);
                status.light_available = names.contains(&cfg.light_model);
                status.status = if status.heavy_available || status.light_available {
                    "ready".to_string()
                } else {
                    "models_missing".to_string()
                };
                status.all_models = names;
            }
            Err(e) => {
                warn!(error = %e, "Ollama not reachable");
                status.error = Some(e.to_string());
            }
        }
        status
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        let cfg = &self.config;
        match (cfg.kind, tier) {
            (ProviderKind::OpenAi, ModelTier::Adventure) => &cfg.adventure_model,
            (ProviderKind::OpenAi, _) => &cfg.openai_model,
            (ProviderKind::Ollama, ModelTier::Light) => &cfg.light_model,
            (ProviderKind::Ollama, _) => &cfg.heavy_model,
        }
    }

    /// Runs a completion that must answer with JSON and parses the answer.
    pub async fn complete_json(&self, request: JsonRequest<'_>) -> Result<Value, LlmError> {
        if !self.is_ready() {
            return Err(LlmError::Unavailable("provider not ready".to_string()));
        }
        let model = self.model_for(request.tier).to_string();
        let raw = match self.config.kind {
            ProviderKind::OpenAi => self.openai_json(&model, request).await?,
            ProviderKind::Ollama => self.ollama_json(&model, request).await?,
        };
        Ok(serde_json::from_str(raw.trim())?)
    }

    async fn openai_json(&self, model: &str, request: JsonRequest<'_>) -> Result<String, LlmError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::Unavailable("OPENAI_API_KEY".to_string()))?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(ChatMessage {
                role: "system".into(),
                content: system.into(),
            });
        }
        messages.push(ChatMessage {
            role: "user".into(),
            content: request.prompt.into(),
        });

        let url = format!("{}/chat/completions", self.config.openai_endpoint);
        let payload = serde_json::json!({
            "model": model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "response_format": {"type": "json_object"},
        });

        let response = self.post_with_retry(&url, Some(api_key), &payload).await?;
        let chat: ChatResponse = serde_json::from_slice(&response)?;
        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::EmptyChoices)
    }

    async fn ollama_json(&self, model: &str, request: JsonRequest<'_>) -> Result<String, LlmError> {
        if !self.status.model_available(model) {
            return Err(LlmError::Unavailable(format!("model {model} not pulled")));
        }

        let mut payload = serde_json::json!({
            "model": model,
            "prompt": request.prompt,
            "stream": false,
            "format": "json",
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            },
        });
        if let Some(system) = request.system {
            payload["system"] = Value::String(system.to_string());
        }

        let url = format!("{}/api/generate", self.config.ollama_url);
        let resp = self
            .client
            .post(&url)
            .timeout(self.config.timeout)
            .json(&payload)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus { status, body });
        }
        let generated: OllamaGenerateResponse = resp.json().await?;
        Ok(generated.response)
    }

    async fn post_with_retry(
        &self,
        url: &str,
        api_key: Option<&str>,
        payload: &Value,
    ) -> Result<bytes::Bytes, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for retry in 0..=MAX_RETRIES {
            let mut req = self.client.post(url).json(payload);
            if let Some(key) = api_key {
                req = req.bearer_auth(key);
            }
            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp.bytes().await?);
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = LlmError::HttpStatus { status, body };
                    if retry < MAX_RETRIES && is_retryable(status) {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, ?status, "LLM request failed, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    let err = LlmError::Request(e);
                    if retry < MAX_RETRIES {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, "LLM request error, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| LlmError::Unavailable("no attempt made".to_string())))
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}

fn normalize_endpoint(endpoint: String) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ollama_config() -> LlmConfig {
        LlmConfig {
            kind: ProviderKind::Ollama,
            api_key: None,
            openai_endpoint: DEFAULT_OPENAI_ENDPOINT.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            adventure_model: DEFAULT_ADVENTURE_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            heavy_model: DEFAULT_HEAVY_MODEL.to_string(),
            light_model: DEFAULT_LIGHT_MODEL.to_string(),
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("https://api.example.com/".into()), "https://api.example.com/v1");
        assert_eq!(normalize_endpoint("https://api.example.com/v1".into()), "https://api.example.com/v1");
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(reqwest::StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_status_reset() {
        let provider = LlmProvider::new(ollama_config());
        assert!(!provider.is_ready());
        provider.status.set(AiStatus {
            status: "ready".into(),
            provider: "ollama".into(),
            heavy_model: DEFAULT_HEAVY_MODEL.into(),
            light_model: DEFAULT_LIGHT_MODEL.into(),
            heavy_available: false,
            light_available: true,
            ollama_url: None,
            all_models: vec![DEFAULT_LIGHT_MODEL.into()],
            error: None,
        });
        assert!(provider.is_ready());
        assert!(provider.status.model_available(DEFAULT_LIGHT_MODEL));
        assert!(!provider.status.model_available(DEFAULT_HEAVY_MODEL));
        provider.reset();
        assert!(provider.status().is_none());
    }

    #[test]
    fn test_model_tiers() {
        let provider = LlmProvider::new(ollama_config());
        assert_eq!(provider.model_for(ModelTier::Light), DEFAULT_LIGHT_MODEL);
        assert_eq!(provider.model_for(ModelTier::Adventure), DEFAULT_HEAVY_MODEL);

        let mut cfg = ollama_config();
        cfg.kind = ProviderKind::OpenAi;
        cfg.api_key = Some("sk-test".into());
        let provider = LlmProvider::new(cfg);
        assert_eq!(provider.model_for(ModelTier::Adventure), DEFAULT_ADVENTURE_MODEL);
        assert_eq!(provider.model_for(ModelTier::Heavy), DEFAULT_OPENAI_MODEL);
    }

    #[tokio::test]
    async fn test_complete_json_requires_probe() {
        let provider = LlmProvider::new(ollama_config());
        let result = provider
            .complete_json(JsonRequest {
                tier: ModelTier::Light,
                system: None,
                prompt: "[]",
                temperature: 0.5,
                max_tokens: 10,
            })
            .await;
        assert!(matches!(result, Err(LlmError::Unavailable(_))));
    }
}
