//! Result rendering for the command-line tools.
//!
//! A result is written either as JSON or as a human-oriented summary, never
//! both in one invocation. Human output is built from [`Panel`] and
//! [`Table`] and coloured through [`Style`].

use std::io::{IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;

mod panel;
mod table;

pub use panel::Panel;
pub use table::Table;

use crate::Error;

/// How a result is written to standard output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Human,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json { OutputMode::Json } else { OutputMode::Human }
    }
}

/// Human-readable rendering of a result.
pub trait Render {
    fn render(&self, style: &Style) -> String;
}

/// Terminal decoration settings for human output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub color: bool,
}

impl Style {
    /// Colour only when stdout is a terminal and `NO_COLOR` is unset.
    pub fn detect() -> Self {
        let color = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self { color }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn label(&self, text: &str) -> String {
        if self.color { text.cyan().bold().to_string() } else { text.to_string() }
    }

    pub fn heading(&self, text: &str) -> String {
        if self.color { text.bold().to_string() } else { text.to_string() }
    }

    pub fn dim(&self, text: &str) -> String {
        if self.color { text.dimmed().to_string() } else { text.to_string() }
    }

    pub fn good(&self, text: &str) -> String {
        if self.color { text.green().to_string() } else { text.to_string() }
    }

    pub fn bad(&self, text: &str) -> String {
        if self.color { text.red().to_string() } else { text.to_string() }
    }

    pub fn warn(&self, text: &str) -> String {
        if self.color { text.yellow().to_string() } else { text.to_string() }
    }
}

/// Write `value` to `out` in the requested mode.
///
/// # Errors
///
/// Returns `Error::Serialization` if JSON encoding fails and `Error::Io`
/// if the writer fails.
pub fn emit<T>(out: &mut dyn Write, value: &T, mode: OutputMode, style: &Style) -> Result<(), Error>
where
    T: Serialize + Render + ?Sized,
{
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        }
        OutputMode::Human => {
            let text = value.render(style);
            write!(out, "{text}")?;
            if !text.ends_with('\n') {
                writeln!(out)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Acknowledgement for commands that only change state ("session cleared").
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq)]
pub struct Notice {
    pub ok: bool,
    pub message: String,
}

impl Notice {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { ok: true, message: message.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { ok: false, message: message.into() }
    }
}

impl Render for Notice {
    fn render(&self, style: &Style) -> String {
        if self.ok {
            format!("{} {}", style.good("✓"), self.message)
        } else {
            format!("{} {}", style.warn("!"), self.message)
        }
    }
}

/// Display width of a string, ignoring ANSI escape sequences.
pub(crate) fn visible_width(text: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    for c in text.chars() {
        if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if c == '\u{1b}' {
            in_escape = true;
        } else {
            width += 1;
        }
    }
    width
}
