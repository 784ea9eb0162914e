//! `airtable-cli`: records and schema through the Airtable Web API.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use toolbelt_client::airtable::{
    AirtableClient, ChangedRecords, ListOptions, RecordList, Sort, parse_fields_input, parse_updates_input,
    records_to_csv,
};
use toolbelt_core::output::Notice;
use toolbelt_core::{ToolConfig, ToolContext};

use super::{GlobalArgs, Output, read_data};

pub use toolbelt_client::airtable::TOOL;

#[derive(Debug, Parser)]
#[command(name = "airtable-cli", version, about = "Read and write Airtable records")]
pub struct AirtableCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Personal Access Token (overrides AIRTABLE_PAT).
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: AirtableCommand,
}

/// Base and table every record command addresses.
#[derive(Debug, Args)]
pub struct TableArgs {
    /// Base ID (app...).
    pub base_id: String,
    /// Table name or ID.
    pub table: String,
}

/// Record data given inline or from a file.
#[derive(Debug, Args)]
pub struct DataArgs {
    /// JSON object of fields, or an array of them.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,

    /// File holding the JSON data.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Let Airtable convert values to the field types.
    #[arg(long)]
    pub typecast: bool,
}

impl DataArgs {
    fn read(&self) -> Result<String> {
        read_data(self.data.clone(), self.file.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ListFormat {
    /// One row per record.
    Table,
    /// Every field of every record.
    #[default]
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// CSV when the output file ends in `.csv`, JSON otherwise.
    fn for_path(path: Option<&Path>) -> Self {
        match path.and_then(Path::extension) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ExportFormat::Csv,
            _ => ExportFormat::Json,
        }
    }

    fn encode(self, records: &RecordList) -> Result<Vec<u8>> {
        match self {
            ExportFormat::Csv => Ok(records_to_csv(records)?),
            ExportFormat::Json => {
                let mut bytes = serde_json::to_vec_pretty(records)?;
                bytes.push(b'\n');
                Ok(bytes)
            }
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum AirtableCommand {
    /// Show the user the token belongs to.
    Whoami,

    /// List accessible bases.
    Bases,

    /// Show tables, fields and views of a base.
    Schema { base_id: String },

    /// Show the fields of one table with their types and options.
    Fields {
        #[command(flatten)]
        target: TableArgs,
    },

    /// Write every record of a table as CSV or JSON.
    Export {
        #[command(flatten)]
        target: TableArgs,

        /// Read through a view.
        #[arg(long)]
        view: Option<String>,

        /// Formula records must satisfy.
        #[arg(long)]
        filter_formula: Option<String>,

        /// Defaults to CSV for a `.csv` output file and JSON otherwise.
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,

        /// File to write instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List records.
    List {
        #[command(flatten)]
        target: TableArgs,

        /// Only return these fields.
        #[arg(long, num_args = 1..)]
        fields: Vec<String>,

        /// Formula records must satisfy.
        #[arg(long)]
        filter_formula: Option<String>,

        /// Stop after this many records.
        #[arg(long)]
        max_records: Option<u32>,

        /// Records per request (max 100).
        #[arg(long)]
        page_size: Option<u32>,

        /// Sort as FIELD or FIELD:asc|desc.
        #[arg(long, num_args = 1..)]
        sort: Vec<Sort>,

        /// Read through a view.
        #[arg(long)]
        view: Option<String>,

        /// Human output layout.
        #[arg(long, value_enum, default_value_t)]
        format: ListFormat,
    },

    /// Fetch one record.
    Get {
        #[command(flatten)]
        target: TableArgs,
        record_id: String,
    },

    /// Create records (sent in batches of 10).
    Create {
        #[command(flatten)]
        target: TableArgs,
        #[command(flatten)]
        data: DataArgs,
    },

    /// Update one record, or many from an array of {id, fields}.
    Update {
        #[command(flatten)]
        target: TableArgs,
        record_id: Option<String>,
        #[command(flatten)]
        data: DataArgs,
    },

    /// Update records matched on fields, creating the rest.
    Upsert {
        #[command(flatten)]
        target: TableArgs,
        #[command(flatten)]
        data: DataArgs,

        /// Fields that identify an existing record.
        #[arg(long, num_args = 1.., required = true)]
        merge_on: Vec<String>,
    },

    /// Delete records (sent in batches of 10).
    Delete {
        #[command(flatten)]
        target: TableArgs,
        #[arg(required = true)]
        record_ids: Vec<String>,
    },
}

pub async fn run(ctx: &ToolContext, cli: AirtableCli, writer: &mut dyn Write) -> Result<()> {
    let mut out = Output::for_args(writer, &cli.global);
    let mut config = ToolConfig::load(ctx)?;
    if let Some(token) = cli.token {
        config.api_key = Some(token);
    }
    run_with(&config, cli.command, &mut out).await
}

/// Run one command with an already loaded config.
pub async fn run_with(config: &ToolConfig, command: AirtableCommand, out: &mut Output<'_>) -> Result<()> {
    let client = AirtableClient::from_config(config)?;

    match command {
        AirtableCommand::Whoami => out.emit(&client.whoami().await?),
        AirtableCommand::Bases => out.emit(&client.bases().await?),
        AirtableCommand::Schema { base_id } => out.emit(&client.schema(&base_id).await?),
        AirtableCommand::Fields { target } => out.emit(&client.fields(&target.base_id, &target.table).await?),
        AirtableCommand::Export { target, view, filter_formula, format, output } => {
            let options = ListOptions { view, filter_formula, ..Default::default() };
            let records = client.list_records(&target.base_id, &target.table, &options).await?;
            let bytes = format.unwrap_or_else(|| ExportFormat::for_path(output.as_deref())).encode(&records)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, bytes).with_context(|| format!("could not write {}", path.display()))?;
                    tracing::info!(records = records.len(), path = %path.display(), "exported table");
                    out.emit(&Notice::ok(format!("Exported {} records to {}", records.len(), path.display())))
                }
                None => out.write_raw(&bytes),
            }
        }
        AirtableCommand::List { target, fields, filter_formula, max_records, page_size, sort, view, format } => {
            let options = ListOptions { fields, filter_formula, max_records, page_size, sort, view };
            let records = client.list_records(&target.base_id, &target.table, &options).await?;
            if out.is_json() || format == ListFormat::Table || records.is_empty() {
                return out.emit(&records);
            }
            for record in &records.0 {
                out.emit(record)?;
            }
            Ok(())
        }
        AirtableCommand::Get { target, record_id } => {
            out.emit(&client.get_record(&target.base_id, &target.table, &record_id).await?)
        }
        AirtableCommand::Create { target, data } => {
            let records = parse_fields_input(&data.read()?)?;
            let created = client.create_records(&target.base_id, &target.table, &records, data.typecast).await?;
            out.emit(&ChangedRecords { action: "Created".into(), records: created })
        }
        AirtableCommand::Update { target, record_id: Some(record_id), data } => {
            let mut records = parse_fields_input(&data.read()?)?;
            if records.len() != 1 {
                anyhow::bail!("updating a single record takes one JSON object of fields");
            }
            let fields = records.remove(0);
            let record =
                client.update_record(&target.base_id, &target.table, &record_id, &fields, data.typecast).await?;
            out.emit(&record)
        }
        AirtableCommand::Update { target, record_id: None, data } => {
            let updates = parse_updates_input(&data.read()?)?;
            let updated = client.update_records(&target.base_id, &target.table, &updates, data.typecast).await?;
            out.emit(&ChangedRecords { action: "Updated".into(), records: updated })
        }
        AirtableCommand::Upsert { target, data, merge_on } => {
            let records = parse_fields_input(&data.read()?)?;
            let written = client
                .upsert_records(&target.base_id, &target.table, &records, &merge_on, data.typecast)
                .await?;
            out.emit(&ChangedRecords { action: "Upserted".into(), records: written })
        }
        AirtableCommand::Delete { target, record_ids } => {
            out.emit(&client.delete_records(&target.base_id, &target.table, &record_ids).await?)
        }
    }
}
