//! xAI Grok chat client.
//!
//! ### API
//!
//! - **Endpoint**: `https://api.x.ai/v1/chat/completions` (OpenAI-compatible, non-streaming)
//! - **Authentication**: bearer token.
//! - **Personas**: an optional system prompt chosen by `--style`; it is sent
//!   with each request but never stored in the session.
//! - **Reports**: `trending`, `track` and `sentiment` are one-shot prompts
//!   with their own instruction and a lower temperature.

pub mod analysis;
pub mod request;
pub mod response;

pub use analysis::{SentimentReport, TrackReport, TrendingReport};
pub use request::{ChatRequest, DEFAULT_MODEL, MODELS, Persona, validate_model};
pub use response::{ChatReply, ModelInfo, ModelList, Usage};

use toolbelt_core::session::Message;
use toolbelt_core::{ToolConfig, ToolSpec};

use crate::http::{ApiClient, ApiError, ApiRequest, Auth, ClientConfig};
use response::CompletionResponse;

pub const TOOL: ToolSpec = ToolSpec {
    name: "grok-cli",
    env_prefix: "GROK_CLI_",
    credential_env: "GROK_API_KEY",
    setup_hint: "Create an API key at https://console.x.ai, then either:\n  \
                 export GROK_API_KEY='your-key'\n  \
                 grok-cli config set api_key 'your-key'",
    default_base_url: "https://api.x.ai/v1",
};

/// Config keys read from the tool-specific settings.
pub const DEFAULT_MODEL_KEY: &str = "default_model";
pub const DEFAULT_STYLE_KEY: &str = "default_style";

#[derive(Debug, Clone)]
pub struct GrokClient {
    api: ApiClient,
}

impl GrokClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Build from a loaded config; fails fast when no API key is set.
    pub fn from_config(config: &ToolConfig) -> Result<Self, ApiError> {
        let key = config.require_api_key(&TOOL)?;
        let client_config = ClientConfig::from_tool_config(config, TOOL.default_base_url, Auth::bearer(key));
        Ok(Self::new(ApiClient::new(client_config)?))
    }

    /// Send one completion request.
    pub async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        request.validate()?;

        tracing::debug!(model = %request.model, messages = request.messages.len(), "requesting completion");

        let raw: CompletionResponse = self.api.send(&ApiRequest::post("chat/completions").json(request)?).await?;
        ChatReply::try_from(raw)
    }

    /// Ask `prompt` with optional persona and prior history.
    pub async fn chat(
        &self, model: &str, persona: Option<Persona>, history: &[Message], prompt: &str,
    ) -> Result<ChatReply, ApiError> {
        self.complete(&ChatRequest::new(model, persona, history, prompt)).await
    }

    /// Top trending topics on X, optionally within one category.
    pub async fn trending(&self, model: &str, category: Option<&str>, limit: u32) -> Result<TrendingReport, ApiError> {
        let reply = self.complete(&analysis::trending_request(model, category, limit)).await?;
        Ok(TrendingReport {
            trends: reply.response,
            category: category.map(str::to_string),
            limit,
            timestamp: chrono::Utc::now(),
        })
    }

    /// Recent discussion about `keyword` over a window such as `5m` or `1h`.
    pub async fn track(&self, model: &str, keyword: &str, window: &str) -> Result<TrackReport, ApiError> {
        let reply = self.complete(&analysis::track_request(model, keyword, window)).await?;
        Ok(TrackReport {
            keyword: keyword.to_string(),
            duration: window.to_string(),
            analysis: reply.response,
            timestamp: chrono::Utc::now(),
        })
    }

    pub async fn sentiment(&self, model: &str, topic: &str, posts: u32) -> Result<SentimentReport, ApiError> {
        let reply = self.complete(&analysis::sentiment_request(model, topic, posts)).await?;
        Ok(SentimentReport {
            topic: topic.to_string(),
            posts_analyzed: posts,
            sentiment_analysis: reply.response,
            timestamp: chrono::Utc::now(),
        })
    }
}

/// Model from the flag, then the config, then the built-in default.
pub fn resolve_model(flag: Option<&str>, config: &ToolConfig) -> String {
    flag.or_else(|| config.setting(DEFAULT_MODEL_KEY)).unwrap_or(DEFAULT_MODEL).to_string()
}

/// Persona from the flag, then the config (`default_style`). With neither set
/// no system prompt is sent.
pub fn resolve_persona(flag: Option<Persona>, config: &ToolConfig) -> Result<Option<Persona>, ApiError> {
    if flag.is_some() {
        return Ok(flag);
    }
    config.setting(DEFAULT_STYLE_KEY).map(|style| style.parse().map_err(ApiError::InvalidInput)).transpose()
}

/// Every known model, marking the effective default.
pub fn model_list(default_model: &str) -> ModelList {
    ModelList(
        MODELS
            .iter()
            .map(|(name, description)| ModelInfo {
                name: name.to_string(),
                description: description.to_string(),
                default: *name == default_model,
            })
            .collect(),
    )
}
