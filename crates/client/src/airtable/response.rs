//! Airtable response types and their human rendering.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolbelt_core::output::{Panel, Render, Style, Table};

use super::request::Fields;

/// One record as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(rename = "createdTime", default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default)]
    pub fields: Fields,
}

/// One page of `GET /{base}/{table}`.
#[derive(Debug, Deserialize)]
pub(crate) struct RecordPage {
    #[serde(default)]
    pub records: Vec<Record>,
    pub offset: Option<String>,
}

/// `{records: [...]}` body of create, update and upsert responses.
#[derive(Debug, Deserialize)]
pub(crate) struct RecordBatch {
    #[serde(default)]
    pub records: Vec<Record>,
}

/// Records collected across pages or batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct RecordList(pub Vec<Record>);

impl RecordList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names across every record, sorted.
    pub fn field_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self.0.iter().flat_map(|r| r.fields.keys()).collect();
        names.into_iter().cloned().collect()
    }
}

/// Display form of a single field value.
///
/// Arrays of objects (attachments, collaborators) collapse to a count, other
/// arrays are joined, and objects are shown as compact JSON.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.iter().any(Value::is_object) => format!("[{} items]", items.len()),
        Value::Array(items) => items.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
        other => other.to_string(),
    }
}

impl Render for Record {
    fn render(&self, style: &Style) -> String {
        let mut panel = Panel::new(format!("Record {}", self.id));
        if let Some(created) = &self.created_time {
            panel = panel.field("Created", created.as_str());
        }
        if !self.fields.is_empty() {
            panel = panel.blank();
        }
        for (name, value) in &self.fields {
            panel = panel.field(name.as_str(), format_value(value));
        }
        panel.render(style)
    }
}

impl Render for RecordList {
    fn render(&self, style: &Style) -> String {
        if self.is_empty() {
            return style.dim("No records found");
        }
        let names = self.field_names();
        let mut table = Table::new(std::iter::once("ID".to_string()).chain(names.iter().cloned()));
        for record in &self.0 {
            let cells = names.iter().map(|n| record.fields.get(n).map(format_value).unwrap_or_default());
            table.row(std::iter::once(record.id.clone()).chain(cells));
        }
        table.caption(format!("Total: {} records", self.len())).render(style)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhoAmI {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

impl Render for WhoAmI {
    fn render(&self, style: &Style) -> String {
        let mut panel = Panel::new("Airtable User").field("User ID", self.id.as_str());
        if let Some(email) = &self.email {
            panel = panel.field("Email", email.as_str());
        }
        if let Some(scopes) = &self.scopes {
            panel = panel.field("Scopes", scopes.join(", "));
        }
        panel.render(style)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Base {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub permission_level: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BasePage {
    #[serde(default)]
    pub bases: Vec<Base>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct BaseList(pub Vec<Base>);

impl Render for BaseList {
    fn render(&self, style: &Style) -> String {
        if self.0.is_empty() {
            return style.dim("No bases found. Check that the token has access to at least one base.");
        }
        let mut table = Table::new(["ID", "Name", "Permission"]).title("Airtable Bases");
        for base in &self.0 {
            table.row([base.id.as_str(), base.name.as_str(), base.permission_level.as_str()]);
        }
        table.caption(format!("Total: {} bases", self.0.len())).render(style)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Type-specific settings such as select choices or number precision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSchema {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub primary_field_id: String,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
    #[serde(default)]
    pub views: Vec<ViewSchema>,
}

/// Tables of one base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: Vec<TableSchema>,
}

impl Schema {
    /// Table matched by ID or exact name.
    pub fn into_table(self, name_or_id: &str) -> Option<TableSchema> {
        self.tables.into_iter().find(|t| t.id == name_or_id || t.name == name_or_id)
    }
}

/// Fields of one table. Serializes as the bare field array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldList {
    #[serde(skip)]
    pub table: String,
    pub fields: Vec<FieldSchema>,
}

impl From<TableSchema> for FieldList {
    fn from(table: TableSchema) -> Self {
        Self { table: table.name, fields: table.fields }
    }
}

impl Render for FieldList {
    fn render(&self, style: &Style) -> String {
        let mut table = Table::new(["Name", "Type", "ID", "Details"])
            .title(format!("Fields in {} ({} total)", self.table, self.fields.len()));
        for field in &self.fields {
            let mut details: Vec<String> = field.description.iter().cloned().collect();
            if let Some(Value::Object(options)) = &field.options {
                details.extend(options.iter().map(|(k, v)| format!("{k}: {}", format_value(v))));
            }
            table.row([field.name.clone(), field.kind.clone(), field.id.clone(), details.join("; ")]);
        }
        table.render(style)
    }
}

impl Render for Schema {
    fn render(&self, style: &Style) -> String {
        if self.tables.is_empty() {
            return style.dim("No tables found");
        }
        self.tables
            .iter()
            .map(|table| {
                let mut panel = Panel::new(format!("{} ({})", table.name, table.id));
                if let Some(description) = &table.description {
                    panel = panel.text(description.as_str()).blank();
                }
                for field in &table.fields {
                    let primary = if field.id == table.primary_field_id { " (primary)" } else { "" };
                    panel = panel.field(field.name.as_str(), format!("{}{primary}", field.kind));
                }
                if !table.views.is_empty() {
                    let views: Vec<&str> = table.views.iter().map(|v| v.name.as_str()).collect();
                    panel = panel.footer(format!("Views: {}", views.join(", ")));
                }
                panel.render(style)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedRecord {
    pub id: String,
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteBatch {
    #[serde(default)]
    pub records: Vec<DeletedRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct DeletedList(pub Vec<DeletedRecord>);

impl Render for DeletedList {
    fn render(&self, style: &Style) -> String {
        let deleted = self.0.iter().filter(|r| r.deleted).count();
        let mut out = format!("{} Deleted {deleted} record(s)\n", style.good("✓"));
        for record in &self.0 {
            let mark = if record.deleted { style.dim("deleted") } else { style.bad("not deleted") };
            out.push_str(&format!("  {}  {mark}\n", record.id));
        }
        out
    }
}

/// Records written by create, update or upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedRecords {
    pub action: String,
    pub records: RecordList,
}

impl Render for ChangedRecords {
    fn render(&self, style: &Style) -> String {
        let mut out = format!("{} {} {} record(s)\n", style.good("✓"), self.action, self.records.len());
        for record in &self.records.0 {
            out.push_str(&format!("  {}\n", record.id));
        }
        out
    }
}
