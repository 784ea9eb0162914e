//! Command implementations for the three binaries.
//!
//! Each tool module holds its clap definitions and a `run` function taking
//! the tool context, the parsed command line and the writer for results.

use std::io::Write;

use clap::{ArgAction, Args};
use serde::Serialize;
use toolbelt_core::output::{self, OutputMode, Render, Style};

pub mod airtable;
pub mod grok;
pub mod weather;

/// Flags shared by every tool.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Print the result as JSON instead of a human summary.
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Log more to stderr (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Destination for command results: JSON or human, never both.
pub struct Output<'a> {
    writer: &'a mut dyn Write,
    mode: OutputMode,
    style: Style,
}

impl<'a> Output<'a> {
    pub fn new(writer: &'a mut dyn Write, mode: OutputMode, style: Style) -> Self {
        Self { writer, mode, style }
    }

    /// Mode from `--json`, colour detected from the terminal.
    pub fn for_args(writer: &'a mut dyn Write, args: &GlobalArgs) -> Self {
        Self::new(writer, OutputMode::from_json_flag(args.json), Style::detect())
    }

    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    pub fn emit<T: Serialize + Render + ?Sized>(&mut self, value: &T) -> anyhow::Result<()> {
        output::emit(&mut *self.writer, value, self.mode, &self.style)?;
        Ok(())
    }

    /// Bytes passed through untouched, e.g. a CSV export.
    pub fn write_raw(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(bytes)?;
        Ok(())
    }
}

/// Read `--data` or, failing that, the contents of `--file`.
pub(crate) fn read_data(data: Option<String>, file: Option<&std::path::Path>) -> anyhow::Result<String> {
    match (data, file) {
        (Some(data), _) => Ok(data),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("could not read {}: {e}", path.display())),
        (None, None) => anyhow::bail!("provide the record data with --data or --file"),
    }
}
