//! Named conversation sessions for chat-style tools.
//!
//! Each session is one pretty-printed JSON file under the tool's
//! `sessions/` directory. Only the most recent exchanges are kept.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::clock::{Clock, SystemClock};
use crate::config::ToolContext;
use crate::output::{Panel, Render, Style, Table};

/// One user message plus one assistant reply.
pub const DEFAULT_MAX_EXCHANGES: usize = 10;

/// Age after which `prune` removes a session.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 30;

static SESSION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("session name pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

/// Files written as a bare message array are still readable.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSession {
    Record(Session),
    Legacy(Vec<Message>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub name: String,
    pub messages: usize,
    pub updated_at: DateTime<Utc>,
}

/// Serializes as a plain array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionList(pub Vec<SessionSummary>);

#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), clock: Arc::new(SystemClock) }
    }

    pub fn from_context(ctx: &ToolContext) -> Self {
        Self::new(ctx.sessions_dir())
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, Error> {
        if !SESSION_NAME.is_match(name) {
            return Err(Error::InvalidSessionName(name.to_string()));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }

    /// Load a session, or start an empty one if it does not exist yet.
    pub fn load(&self, name: &str) -> Result<Session, Error> {
        let path = self.path_for(name)?;
        if !path.exists() {
            let now = self.clock.now();
            return Ok(Session { name: name.to_string(), created_at: now, updated_at: now, messages: Vec::new() });
        }

        let raw = std::fs::read_to_string(&path)?;
        let session = match serde_json::from_str::<StoredSession>(&raw)? {
            StoredSession::Record(session) => session,
            StoredSession::Legacy(messages) => {
                let modified = std::fs::metadata(&path)?
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| self.clock.now());
                Session { name: name.to_string(), created_at: modified, updated_at: modified, messages }
            }
        };
        Ok(session)
    }

    /// Append messages to a session, trim it and write it back.
    pub fn append(&self, name: &str, messages: &[Message]) -> Result<Session, Error> {
        let mut session = self.load(name)?;
        session.messages.extend(messages.iter().filter(|m| m.role != Role::System).cloned());
        session.updated_at = self.clock.now();
        self.save(&mut session)?;
        tracing::debug!(session = name, messages = session.messages.len(), "session saved");
        Ok(session)
    }

    /// Trim to the most recent exchanges and write to disk.
    pub fn save(&self, session: &mut Session) -> Result<(), Error> {
        let path = self.path_for(&session.name)?;
        trim_messages(&mut session.messages, DEFAULT_MAX_EXCHANGES);
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, serde_json::to_string_pretty(session)?)?;
        Ok(())
    }

    pub fn list(&self) -> Result<SessionList, Error> {
        if !self.dir.exists() {
            return Ok(SessionList(Vec::new()));
        }
        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load(name) {
                Ok(session) => sessions.push(SessionSummary {
                    name: session.name,
                    messages: session.messages.len(),
                    updated_at: session.updated_at,
                }),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable session"),
            }
        }
        sessions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(SessionList(sessions))
    }

    /// Delete a session. Returns whether it existed.
    pub fn delete(&self, name: &str) -> Result<bool, Error> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        Ok(true)
    }

    /// Delete sessions not updated within `max_age`. Returns the removed names.
    pub fn prune_older_than(&self, max_age: Duration) -> Result<Vec<String>, Error> {
        let cutoff = self.clock.now().checked_sub_signed(max_age).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut removed = Vec::new();
        for summary in self.list()?.0 {
            if summary.updated_at < cutoff && self.delete(&summary.name)? {
                removed.push(summary.name);
            }
        }
        if !removed.is_empty() {
            tracing::debug!(count = removed.len(), "pruned old sessions");
        }
        Ok(removed)
    }
}

/// Keep the last `max_exchanges` user/assistant pairs, starting on a user turn.
fn trim_messages(messages: &mut Vec<Message>, max_exchanges: usize) {
    let limit = max_exchanges * 2;
    if messages.len() > limit {
        messages.drain(..messages.len() - limit);
    }
    while messages.first().is_some_and(|m| m.role != Role::User) {
        messages.remove(0);
    }
}

impl Render for Session {
    fn render(&self, style: &Style) -> String {
        let mut panel = Panel::new(format!("Session '{}'", self.name))
            .field("Created", self.created_at.format("%Y-%m-%d %H:%M").to_string())
            .field("Updated", self.updated_at.format("%Y-%m-%d %H:%M").to_string())
            .field("Messages", self.messages.len().to_string());
        for message in &self.messages {
            let who = match message.role {
                Role::System => "system",
                Role::User => "you",
                Role::Assistant => "assistant",
            };
            panel = panel.blank().text(style.heading(who));
            for line in message.content.lines() {
                panel = panel.text(line);
            }
        }
        panel.render(style)
    }
}

impl Render for SessionList {
    fn render(&self, style: &Style) -> String {
        if self.0.is_empty() {
            return "No sessions found.\n".to_string();
        }
        let mut table = Table::new(["Session", "Messages", "Modified"]).title("Conversation Sessions");
        for s in &self.0 {
            table.row([s.name.clone(), s.messages.to_string(), s.updated_at.format("%Y-%m-%d %H:%M").to_string()]);
        }
        table.render(style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store() -> (tempfile::TempDir, SessionStore, ManualClock) {
        let tmp = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let store = SessionStore::new(tmp.path().join("sessions")).with_clock(Arc::new(clock.clone()));
        (tmp, store, clock)
    }

    fn exchange(n: usize) -> [Message; 2] {
        [Message::user(format!("question {n}")), Message::assistant(format!("answer {n}"))]
    }

    #[test]
    fn test_load_missing_is_empty() {
        let (_tmp, store, _clock) = store();
        let session = store.load("work").unwrap();
        assert_eq!(session.name, "work");
        assert!(session.messages.is_empty());
    }

    #[test]
    fn test_append_persists_in_order() {
        let (_tmp, store, _clock) = store();
        store.append("work", &exchange(1)).unwrap();
        store.append("work", &exchange(2)).unwrap();

        let session = store.load("work").unwrap();
        let contents: Vec<&str> = session.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["question 1", "answer 1", "question 2", "answer 2"]);
    }

    #[test]
    fn test_append_caps_to_recent_exchanges() {
        let (_tmp, store, _clock) = store();
        for n in 0..15 {
            store.append("long", &exchange(n)).unwrap();
        }
        let session = store.load("long").unwrap();
        assert_eq!(session.messages.len(), DEFAULT_MAX_EXCHANGES * 2);
        assert_eq!(session.messages[0], Message::user("question 5"));
        assert_eq!(session.messages.last().unwrap(), &Message::assistant("answer 14"));
    }

    #[test]
    fn test_system_messages_not_stored() {
        let (_tmp, store, _clock) = store();
        let mut messages = vec![Message::system("Be witty.")];
        messages.extend(exchange(1));
        let session = store.append("style", &messages).unwrap();
        assert!(session.messages.iter().all(|m| m.role != Role::System));
    }

    #[test]
    fn test_trim_starts_on_user_turn() {
        let mut messages = vec![Message::assistant("orphan"), Message::user("q"), Message::assistant("a")];
        trim_messages(&mut messages, 10);
        assert_eq!(messages[0], Message::user("q"));
    }

    #[test]
    fn test_rejects_path_escaping_names() {
        let (_tmp, store, _clock) = store();
        for bad in ["../etc/passwd", "a/b", "", "with space"] {
            assert!(matches!(store.load(bad), Err(Error::InvalidSessionName(_))), "{bad} accepted");
        }
    }

    #[test]
    fn test_reads_legacy_array_format() {
        let (_tmp, store, _clock) = store();
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(
            store.dir().join("old.json"),
            r#"[{"role": "user", "content": "hi"}, {"role": "assistant", "content": "hello"}]"#,
        )
        .unwrap();
        let session = store.load("old").unwrap();
        assert_eq!(session.messages.len(), 2);
    }

    #[test]
    fn test_list_and_delete() {
        let (_tmp, store, _clock) = store();
        assert!(store.list().unwrap().0.is_empty());
        store.append("beta", &exchange(1)).unwrap();
        store.append("alpha", &exchange(1)).unwrap();

        let names: Vec<String> = store.list().unwrap().0.into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["alpha", "beta"]);

        assert!(store.delete("alpha").unwrap());
        assert!(!store.delete("alpha").unwrap());
        assert_eq!(store.list().unwrap().0.len(), 1);
    }

    #[test]
    fn test_prune_removes_only_old_sessions() {
        let (_tmp, store, clock) = store();
        store.append("stale", &exchange(1)).unwrap();
        clock.advance(Duration::days(31));
        store.append("recent", &exchange(1)).unwrap();

        let removed = store.prune_older_than(Duration::days(DEFAULT_MAX_AGE_DAYS)).unwrap();
        assert_eq!(removed, ["stale"]);
        assert!(store.load("recent").unwrap().messages.len() == 2);
    }

    #[test]
    fn test_list_render_is_not_json() {
        let (_tmp, store, _clock) = store();
        store.append("work", &exchange(1)).unwrap();
        let text = store.list().unwrap().render(&Style::plain());
        assert!(text.contains("work"));
        assert!(serde_json::from_str::<serde_json::Value>(&text).is_err());
    }
}
