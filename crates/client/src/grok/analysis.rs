//! One-shot X analysis reports: trending topics, keyword tracking and sentiment.
//!
//! Each report sends a fixed instruction plus a templated prompt at
//! [`ANALYSIS_TEMPERATURE`] and never touches a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use toolbelt_core::output::{Panel, Render, Style};

use super::request::{ANALYSIS_TEMPERATURE, ChatRequest};

pub const DEFAULT_TREND_LIMIT: u32 = 10;
pub const DEFAULT_TRACK_WINDOW: &str = "5m";
pub const DEFAULT_SENTIMENT_POSTS: u32 = 100;

const TRENDING_INSTRUCTION: &str = "You have real-time access to X trending data. Be specific and current.";
const TRACK_INSTRUCTION: &str = "You have real-time access to X data. Focus on the most recent and relevant posts.";
const SENTIMENT_INSTRUCTION: &str = "You have access to real-time X sentiment data. Be data-driven and specific.";

pub(crate) fn trending_request(model: &str, category: Option<&str>, limit: u32) -> ChatRequest {
    let scope = category.map(|c| format!(" in the {c} category")).unwrap_or_default();
    let prompt = format!(
        "What's trending on X (Twitter) right now{scope}? \
         Give me the top {limit} trending topics with brief context for each."
    );
    ChatRequest::instructed(model, TRENDING_INSTRUCTION, &prompt).with_temperature(ANALYSIS_TEMPERATURE)
}

pub(crate) fn track_request(model: &str, keyword: &str, window: &str) -> ChatRequest {
    let prompt = format!(
        "Track real-time discussions about \"{keyword}\" on X over the last {window}.\n\n\
         Provide:\n\
         1. Volume of posts\n\
         2. Key influencers discussing it\n\
         3. Overall sentiment\n\
         4. Main themes or arguments\n\
         5. Any breaking news or developments"
    );
    ChatRequest::instructed(model, TRACK_INSTRUCTION, &prompt).with_temperature(ANALYSIS_TEMPERATURE)
}

pub(crate) fn sentiment_request(model: &str, topic: &str, posts: u32) -> ChatRequest {
    let prompt = format!(
        "Analyze the sentiment around \"{topic}\" on X based on approximately {posts} recent posts.\n\n\
         Provide:\n\
         1. Overall sentiment breakdown (positive/negative/neutral percentages)\n\
         2. Key positive themes\n\
         3. Key negative themes\n\
         4. Notable opinions or hot takes\n\
         5. Influencer sentiment vs general public"
    );
    ChatRequest::instructed(model, SENTIMENT_INSTRUCTION, &prompt).with_temperature(ANALYSIS_TEMPERATURE)
}

fn report_panel(title: String, body: &str, timestamp: &DateTime<Utc>, style: &Style) -> String {
    let mut panel = Panel::new(title);
    for line in body.lines() {
        panel = panel.text(line);
    }
    panel.footer(timestamp.format("%Y-%m-%d %H:%M UTC").to_string()).render(style)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingReport {
    pub trends: String,
    pub category: Option<String>,
    pub limit: u32,
    pub timestamp: DateTime<Utc>,
}

impl Render for TrendingReport {
    fn render(&self, style: &Style) -> String {
        let title = match &self.category {
            Some(category) => format!("X Trending - {category}"),
            None => "X Trending".to_string(),
        };
        report_panel(title, &self.trends, &self.timestamp, style)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackReport {
    pub keyword: String,
    pub duration: String,
    pub analysis: String,
    pub timestamp: DateTime<Utc>,
}

impl Render for TrackReport {
    fn render(&self, style: &Style) -> String {
        report_panel(format!("Tracking: {}", self.keyword), &self.analysis, &self.timestamp, style)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentReport {
    pub topic: String,
    pub posts_analyzed: u32,
    pub sentiment_analysis: String,
    pub timestamp: DateTime<Utc>,
}

impl Render for SentimentReport {
    fn render(&self, style: &Style) -> String {
        report_panel(format!("Sentiment Analysis: {}", self.topic), &self.sentiment_analysis, &self.timestamp, style)
    }
}
