//! xAI chat completion response types.

use serde::{Deserialize, Serialize};
use toolbelt_core::output::{Panel, Render, Style, Table};

use crate::http::ApiError;

/// Raw response from `POST /chat/completions`.
#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Normalized reply: the first choice's text, the serving model and token usage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub response: String,
    pub model: String,
    pub usage: Option<Usage>,
}

impl TryFrom<CompletionResponse> for ChatReply {
    type Error = ApiError;

    fn try_from(raw: CompletionResponse) -> Result<Self, Self::Error> {
        let response = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ApiError::Parse("completion contained no message".to_string()))?;
        Ok(Self { response, model: raw.model, usage: raw.usage })
    }
}

impl Render for ChatReply {
    fn render(&self, style: &Style) -> String {
        let mut panel = Panel::new("Grok Response");
        for line in self.response.lines() {
            panel = panel.text(line);
        }
        let footer = match &self.usage {
            Some(u) => format!(
                "{} · {} tokens ({} prompt, {} completion)",
                self.model, u.total_tokens, u.prompt_tokens, u.completion_tokens
            ),
            None => self.model.clone(),
        };
        panel.footer(footer).render(style)
    }
}

/// Entry of `grok-cli models`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub description: String,
    pub default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ModelList(pub Vec<ModelInfo>);

impl Render for ModelList {
    fn render(&self, style: &Style) -> String {
        let mut table = Table::new(["Model", "Description"]).title("Available Models");
        for model in &self.0 {
            let name = if model.default { format!("{} (default)", model.name) } else { model.name.clone() };
            table.row([name, model.description.clone()]);
        }
        table.render(style)
    }
}
