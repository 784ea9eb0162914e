//! Airtable request parameters and validation.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::{ApiError, ApiRequest};

/// Records per create / update / delete call accepted by the API.
pub const MAX_RECORDS_PER_REQUEST: usize = 10;

/// Largest `pageSize` the API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

static BASE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^app[A-Za-z0-9]{14}$").expect("base id pattern is valid"));

static RECORD_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^rec[A-Za-z0-9]{14}$").expect("record id pattern is valid"));

/// Field values of one record.
pub type Fields = Map<String, Value>;

pub fn validate_base_id(base_id: &str) -> Result<&str, ApiError> {
    if BASE_ID.is_match(base_id) {
        return Ok(base_id);
    }
    Err(ApiError::InvalidInput(format!(
        "invalid base ID '{base_id}': expected 'app' followed by 14 letters or digits"
    )))
}

pub fn validate_record_id(record_id: &str) -> Result<&str, ApiError> {
    if RECORD_ID.is_match(record_id) {
        return Ok(record_id);
    }
    Err(ApiError::InvalidInput(format!(
        "invalid record ID '{record_id}': expected 'rec' followed by 14 letters or digits"
    )))
}

pub fn validate_table(table: &str) -> Result<&str, ApiError> {
    if table.trim().is_empty() {
        return Err(ApiError::InvalidInput("table name cannot be empty".to_string()));
    }
    Ok(table)
}

/// Reject formulas with unbalanced parentheses or unterminated strings.
///
/// Parentheses inside string literals are ignored; a backslash escapes the
/// next character inside a string.
pub fn check_formula(formula: &str) -> Result<(), ApiError> {
    let invalid = |reason: &str| ApiError::InvalidInput(format!("invalid filter formula: {reason}"));

    let mut depth: i64 = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in formula.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(invalid("unexpected ')'"));
                }
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err(invalid("unterminated string"));
    }
    if depth != 0 {
        return Err(invalid("unbalanced parentheses"));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One `--sort field:dir` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl FromStr for Sort {
    type Err = String;

    /// `Name`, `Name:asc` or `Name:desc`. The last colon separates the direction.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.rsplit_once(':') {
            Some((field, "asc")) => (field, SortDirection::Asc),
            Some((field, "desc")) => (field, SortDirection::Desc),
            _ => (s, SortDirection::Asc),
        };
        if field.trim().is_empty() {
            return Err(format!("invalid sort '{s}': expected FIELD or FIELD:asc|desc"));
        }
        Ok(Self { field: field.to_string(), direction })
    }
}

/// Query options for listing records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub fields: Vec<String>,
    pub filter_formula: Option<String>,
    pub max_records: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Vec<Sort>,
    pub view: Option<String>,
}

impl ListOptions {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(formula) = &self.filter_formula {
            check_formula(formula)?;
        }
        if self.max_records == Some(0) {
            return Err(ApiError::InvalidInput("max records must be at least 1".to_string()));
        }
        if self.page_size == Some(0) {
            return Err(ApiError::InvalidInput("page size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Add the options to a list request, using Airtable's bracketed array syntax.
    pub(crate) fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        let page_size = self.page_size.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE);
        request = request.query("pageSize", page_size);
        request = request.query_opt("maxRecords", self.max_records);
        for field in &self.fields {
            request = request.query("fields[]", field);
        }
        request = request.query_opt("filterByFormula", self.filter_formula.as_deref());
        for (i, sort) in self.sort.iter().enumerate() {
            request = request
                .query(format!("sort[{i}][field]"), &sort.field)
                .query(format!("sort[{i}][direction]"), sort.direction.as_str());
        }
        request.query_opt("view", self.view.as_deref())
    }
}

/// `{id, fields}` item of a PATCH batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewRecord<'a> {
    pub fields: &'a Fields,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateBody<'a> {
    pub records: Vec<NewRecord<'a>>,
    pub typecast: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateBody<'a> {
    pub records: &'a [RecordUpdate],
    pub typecast: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MergeOn<'a> {
    pub fields_to_merge_on: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpsertBody<'a> {
    pub perform_upsert: MergeOn<'a>,
    pub records: Vec<NewRecord<'a>>,
    pub typecast: bool,
}

/// Parse `--data`: one object of fields or an array of them.
pub fn parse_fields_input(data: &str) -> Result<Vec<Fields>, ApiError> {
    let value: Value =
        serde_json::from_str(data).map_err(|e| ApiError::InvalidInput(format!("invalid JSON data: {e}")))?;
    let not_object = || ApiError::InvalidInput("data must be a JSON object or an array of objects".to_string());

    let records = match value {
        Value::Object(fields) => vec![fields],
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(fields) => Ok(fields),
                _ => Err(not_object()),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(not_object()),
    };
    if records.is_empty() {
        return Err(ApiError::InvalidInput("no records in data".to_string()));
    }
    Ok(records)
}

/// Parse a batch update: an array of `{id, fields}` objects.
pub fn parse_updates_input(data: &str) -> Result<Vec<RecordUpdate>, ApiError> {
    let updates: Vec<RecordUpdate> = serde_json::from_str(data).map_err(|e| {
        ApiError::InvalidInput(format!("batch update requires an array of {{id, fields}} objects: {e}"))
    })?;
    for update in &updates {
        validate_record_id(&update.id)?;
    }
    if updates.is_empty() {
        return Err(ApiError::InvalidInput("no records in data".to_string()));
    }
    Ok(updates)
}
