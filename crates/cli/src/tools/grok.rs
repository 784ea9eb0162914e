//! `grok-cli`: chat with xAI Grok, with optional named sessions.

use std::io::Write;

use anyhow::Result;
use clap::{Parser, Subcommand};
use toolbelt_client::grok::analysis::{DEFAULT_SENTIMENT_POSTS, DEFAULT_TRACK_WINDOW, DEFAULT_TREND_LIMIT};
use toolbelt_client::grok::{
    self, DEFAULT_MODEL_KEY, DEFAULT_STYLE_KEY, GrokClient, Persona, resolve_model, resolve_persona,
};
use toolbelt_core::output::Notice;
use toolbelt_core::session::DEFAULT_MAX_AGE_DAYS;
use toolbelt_core::{Message, SessionStore, ToolConfig, ToolContext};

use super::{GlobalArgs, Output};

pub use toolbelt_client::grok::TOOL;

#[derive(Debug, Parser)]
#[command(name = "grok-cli", version, about = "Chat with xAI Grok from the terminal")]
pub struct GrokCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: GrokCommand,
}

#[derive(Debug, Subcommand)]
pub enum GrokCommand {
    /// Ask Grok a question.
    Chat {
        prompt: String,

        /// Keep the conversation in a named session.
        #[arg(short, long)]
        session: Option<String>,

        /// Response style: witty, serious or maximum.
        #[arg(long)]
        style: Option<Persona>,

        /// Model to use (see `grok-cli models`).
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show what is trending on X.
    Trending {
        /// Restrict to a category such as tech or sports.
        #[arg(long)]
        category: Option<String>,

        #[arg(long, default_value_t = DEFAULT_TREND_LIMIT)]
        limit: u32,
    },

    /// Summarize recent discussion about a keyword.
    Track {
        keyword: String,

        /// Time window, e.g. 5m or 1h.
        #[arg(long, default_value = DEFAULT_TRACK_WINDOW)]
        duration: String,
    },

    /// Analyze sentiment around a topic.
    Sentiment {
        topic: String,

        /// Approximate number of posts to consider.
        #[arg(long, default_value_t = DEFAULT_SENTIMENT_POSTS)]
        posts: u32,
    },

    /// Manage saved conversations.
    #[command(subcommand)]
    Session(SessionCommand),

    /// Read or change settings.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// List the available models.
    Models,
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// List saved sessions.
    List,
    /// Print a session's messages.
    Show { name: String },
    /// Delete a session.
    Clear { name: String },
    /// Delete sessions not used for a number of days.
    Prune {
        #[arg(long, default_value_t = DEFAULT_MAX_AGE_DAYS)]
        days: i64,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Save a setting, e.g. `api_key`, `default_model` or `default_style`.
    Set { key: String, value: String },
    /// Show the effective configuration.
    Show,
}

pub async fn run(ctx: &ToolContext, cli: GrokCli, writer: &mut dyn Write) -> Result<()> {
    let mut out = Output::for_args(writer, &cli.global);
    run_with(ctx, cli.command, &mut out).await
}

pub async fn run_with(ctx: &ToolContext, command: GrokCommand, out: &mut Output<'_>) -> Result<()> {
    match command {
        GrokCommand::Chat { prompt, session, style, model } => {
            let config = ToolConfig::load(ctx)?;
            let client = GrokClient::from_config(&config)?;
            let model = resolve_model(model.as_deref(), &config);
            let persona = resolve_persona(style, &config)?;

            let store = SessionStore::from_context(ctx);
            let history = match &session {
                Some(name) => store.load(name)?.messages,
                None => Vec::new(),
            };

            let reply = client.chat(&model, persona, &history, &prompt).await?;

            if let Some(name) = &session {
                store.append(name, &[Message::user(prompt), Message::assistant(reply.response.clone())])?;
            }
            out.emit(&reply)
        }
        GrokCommand::Trending { category, limit } => {
            let (client, model) = client_and_model(ctx)?;
            out.emit(&client.trending(&model, category.as_deref(), limit).await?)
        }
        GrokCommand::Track { keyword, duration } => {
            let (client, model) = client_and_model(ctx)?;
            out.emit(&client.track(&model, &keyword, &duration).await?)
        }
        GrokCommand::Sentiment { topic, posts } => {
            let (client, model) = client_and_model(ctx)?;
            out.emit(&client.sentiment(&model, &topic, posts).await?)
        }
        GrokCommand::Session(command) => run_session(ctx, command, out),
        GrokCommand::Config(ConfigCommand::Set { key, value }) => {
            match key.as_str() {
                "api_key" => ToolConfig::save_api_key(ctx, &value)?,
                DEFAULT_MODEL_KEY => {
                    grok::validate_model(&value)?;
                    ToolConfig::save_value(ctx, &key, &value)?;
                }
                DEFAULT_STYLE_KEY => {
                    value.parse::<Persona>().map_err(anyhow::Error::msg)?;
                    ToolConfig::save_value(ctx, &key, &value)?;
                }
                _ => ToolConfig::save_value(ctx, &key, &value)?,
            }
            out.emit(&Notice::ok(format!("Saved {key}")))
        }
        GrokCommand::Config(ConfigCommand::Show) => {
            let config = ToolConfig::load(ctx)?;
            out.emit(&config.summary(ctx))
        }
        GrokCommand::Models => {
            let config = ToolConfig::load(ctx)?;
            out.emit(&grok::model_list(&resolve_model(None, &config)))
        }
    }
}

/// Reports always use the configured default model.
fn client_and_model(ctx: &ToolContext) -> Result<(GrokClient, String)> {
    let config = ToolConfig::load(ctx)?;
    Ok((GrokClient::from_config(&config)?, resolve_model(None, &config)))
}

fn run_session(ctx: &ToolContext, command: SessionCommand, out: &mut Output<'_>) -> Result<()> {
    let store = SessionStore::from_context(ctx);
    match command {
        SessionCommand::List => out.emit(&store.list()?),
        SessionCommand::Show { name } => {
            let session = store.load(&name)?;
            if session.messages.is_empty() {
                anyhow::bail!("no session named '{name}'");
            }
            out.emit(&session)
        }
        SessionCommand::Clear { name } => {
            if store.delete(&name)? {
                out.emit(&Notice::ok(format!("Session '{name}' cleared")))
            } else {
                out.emit(&Notice::failed(format!("No session named '{name}'")))
            }
        }
        SessionCommand::Prune { days } => {
            if days < 0 {
                anyhow::bail!("--days must not be negative");
            }
            let max_age =
                chrono::TimeDelta::try_days(days).ok_or_else(|| anyhow::anyhow!("--days {days} is too large"))?;
            let removed = store.prune_older_than(max_age)?;
            out.emit(&Notice::ok(format!("Removed {} session(s) older than {days} days", removed.len())))
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use tempfile::TempDir;
    use toolbelt_core::OutputMode;
    use toolbelt_core::Style;

    use super::*;

    fn ctx(dir: &TempDir) -> ToolContext {
        ToolContext::new(grok::TOOL, dir.path())
    }

    async fn run_json(ctx: &ToolContext, args: &[&str]) -> Result<serde_json::Value> {
        let cli = GrokCli::try_parse_from(std::iter::once("grok-cli").chain(args.iter().copied()))?;
        let mut buf = Vec::new();
        let mut out = Output::new(&mut buf, OutputMode::Json, Style::plain());
        run_with(ctx, cli.command, &mut out).await?;
        Ok(serde_json::from_slice(&buf)?)
    }

    #[test]
    fn test_cli_definition() {
        GrokCli::command().debug_assert();
    }

    #[test]
    fn test_style_parsed() {
        let cli = GrokCli::try_parse_from(["grok-cli", "chat", "hi", "--style", "serious", "-s", "work"]).unwrap();
        match cli.command {
            GrokCommand::Chat { style, session, .. } => {
                assert_eq!(style, Some(Persona::Serious));
                assert_eq!(session.as_deref(), Some("work"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(GrokCli::try_parse_from(["grok-cli", "chat", "hi", "--style", "rude"]).is_err());
    }

    #[test]
    fn test_report_defaults() {
        let cli = GrokCli::try_parse_from(["grok-cli", "trending"]).unwrap();
        assert!(matches!(cli.command, GrokCommand::Trending { category: None, limit: 10 }));

        let cli = GrokCli::try_parse_from(["grok-cli", "track", "rust"]).unwrap();
        match cli.command {
            GrokCommand::Track { keyword, duration } => assert_eq!((keyword.as_str(), duration.as_str()), ("rust", "5m")),
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = GrokCli::try_parse_from(["grok-cli", "sentiment", "rust", "--posts", "40"]).unwrap();
        assert!(matches!(cli.command, GrokCommand::Sentiment { posts: 40, .. }));
    }

    #[tokio::test]
    async fn test_config_set_validates_model() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        assert!(run_json(&ctx, &["config", "set", "default_model", "gpt-4"]).await.is_err());

        let saved = run_json(&ctx, &["config", "set", "default_model", "grok-3-mini"]).await.unwrap();
        assert_eq!(saved["ok"], true);

        let models = run_json(&ctx, &["models"]).await.unwrap();
        let default: Vec<&str> = models
            .as_array()
            .unwrap()
            .iter()
            .filter(|m| m["default"] == true)
            .map(|m| m["name"].as_str().unwrap())
            .collect();
        assert_eq!(default, ["grok-3-mini"]);
    }

    #[tokio::test]
    async fn test_session_clear_missing_reports_failure() {
        let dir = TempDir::new().unwrap();
        let notice = run_json(&ctx(&dir), &["session", "clear", "nothing"]).await.unwrap();
        assert_eq!(notice["ok"], false);
    }

    #[tokio::test]
    async fn test_session_list_empty() {
        let dir = TempDir::new().unwrap();
        let list = run_json(&ctx(&dir), &["session", "list"]).await.unwrap();
        assert_eq!(list, serde_json::json!([]));
    }
}
