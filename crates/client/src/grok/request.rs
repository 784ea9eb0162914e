//! xAI chat completion request types, models and personas.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use toolbelt_core::session::Message;

use crate::http::ApiError;

pub const DEFAULT_MODEL: &str = "grok-3";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Lower temperature for the trend and sentiment reports.
pub const ANALYSIS_TEMPERATURE: f32 = 0.3;

/// Text models offered by the xAI API, with a short description.
pub const MODELS: &[(&str, &str)] = &[
    ("grok-2-1212", "Standard Grok 2 model"),
    ("grok-2-vision-1212", "Vision-enabled Grok 2 (text + image input)"),
    ("grok-3", "Latest Grok 3 model"),
    ("grok-3-fast", "Fast variant of Grok 3"),
    ("grok-3-mini", "Smaller Grok 3 model"),
    ("grok-3-mini-fast", "Fast variant of mini Grok 3"),
];

/// Check a model name against [`MODELS`].
pub fn validate_model(model: &str) -> Result<&str, ApiError> {
    if MODELS.iter().any(|(name, _)| *name == model) {
        return Ok(model);
    }
    let known: Vec<&str> = MODELS.iter().map(|(name, _)| *name).collect();
    Err(ApiError::InvalidInput(format!("unknown model '{model}': choose one of {}", known.join(", "))))
}

/// Response style, injected as a system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Witty,
    Serious,
    Maximum,
}

impl Persona {
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Persona::Witty => "Be witty, sarcastic, and clever. Don't hold back on the sass.",
            Persona::Serious => "Be direct and professional. Skip the jokes.",
            Persona::Maximum => "Turn the sass up to 11. Roast everything playfully.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Witty => "witty",
            Persona::Serious => "serious",
            Persona::Maximum => "maximum",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "witty" => Ok(Persona::Witty),
            "serious" => Ok(Persona::Serious),
            "maximum" => Ok(Persona::Maximum),
            other => Err(format!("unknown style '{other}': use witty, serious or maximum")),
        }
    }
}

/// Body of `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub stream: bool,
}

impl ChatRequest {
    /// Persona prompt first, then prior history, then the new user prompt.
    pub fn new(model: &str, persona: Option<Persona>, history: &[Message], prompt: &str) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(persona) = persona {
            messages.push(Message::system(persona.system_prompt()));
        }
        messages.extend_from_slice(history);
        messages.push(Message::user(prompt));

        Self { model: model.to_string(), messages, temperature: DEFAULT_TEMPERATURE, stream: false }
    }

    /// A fixed instruction followed by a single prompt, with no history.
    pub fn instructed(model: &str, instruction: &str, prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![Message::system(instruction), Message::user(prompt)],
            temperature: DEFAULT_TEMPERATURE,
            stream: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        validate_model(&self.model)?;
        match self.messages.last() {
            Some(last) if !last.content.trim().is_empty() => Ok(()),
            _ => Err(ApiError::InvalidInput("prompt cannot be empty".to_string())),
        }
    }
}
