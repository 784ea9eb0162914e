//! Airtable Web API client.
//!
//! ### API
//!
//! - **Endpoint**: `https://api.airtable.com/v0`
//! - **Authentication**: bearer Personal Access Token. Legacy API keys
//!   (`key...`) stopped working in February 2024 and only produce a warning here.
//! - **Pagination**: list endpoints return an `offset` token; requests are
//!   repeated until it is absent or `maxRecords` is reached.
//! - **Batching**: create, update, upsert and delete accept at most
//!   [`MAX_RECORDS_PER_REQUEST`] records per call and are split accordingly.
//! - **Validation**: base IDs, record IDs and filter formulas are checked
//!   before any request is sent.

pub mod export;
pub mod request;
pub mod response;

pub use request::{
    Fields, ListOptions, MAX_PAGE_SIZE, MAX_RECORDS_PER_REQUEST, RecordUpdate, Sort, SortDirection, check_formula,
    parse_fields_input, parse_updates_input, validate_base_id, validate_record_id,
};
pub use export::records_to_csv;
pub use response::{
    Base, BaseList, ChangedRecords, DeletedList, DeletedRecord, FieldList, FieldSchema, Record, RecordList, Schema,
    TableSchema, WhoAmI, format_value,
};

use toolbelt_core::{ToolConfig, ToolSpec};

use crate::http::{ApiClient, ApiError, ApiRequest, Auth, ClientConfig};
use request::{CreateBody, MergeOn, NewRecord, UpdateBody, UpsertBody, validate_table};
use response::{BasePage, DeleteBatch, RecordBatch, RecordPage};

pub const TOOL: ToolSpec = ToolSpec {
    name: "airtable-cli",
    env_prefix: "AIRTABLE_CLI_",
    credential_env: "AIRTABLE_PAT",
    setup_hint: "Create a Personal Access Token:\n  \
                 1. Go to https://airtable.com/create/tokens\n  \
                 2. Add the scopes and bases you need\n  \
                 3. export AIRTABLE_PAT='your-token-here'\n\
                 API keys were deprecated in February 2024 and no longer work.",
    default_base_url: "https://api.airtable.com/v0",
};

/// Warning for tokens that look like a pre-2024 API key.
pub fn token_warning(token: &str) -> Option<&'static str> {
    token.starts_with("key").then_some(
        "this looks like a legacy Airtable API key; API keys were deprecated in February 2024, \
         use a Personal Access Token",
    )
}

#[derive(Debug, Clone)]
pub struct AirtableClient {
    api: ApiClient,
}

impl AirtableClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Build from a loaded config; fails fast when no token is set.
    pub fn from_config(config: &ToolConfig) -> Result<Self, ApiError> {
        let token = config.require_api_key(&TOOL)?;
        if let Some(warning) = token_warning(token) {
            tracing::warn!("{warning}");
        }
        let client_config = ClientConfig::from_tool_config(config, TOOL.default_base_url, Auth::bearer(token));
        Ok(Self::new(ApiClient::new(client_config)?))
    }

    pub async fn whoami(&self) -> Result<WhoAmI, ApiError> {
        self.api.get("meta/whoami").await
    }

    /// Every base the token can see, following `offset` pagination.
    pub async fn bases(&self) -> Result<BaseList, ApiError> {
        let mut bases = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let request = ApiRequest::get("meta/bases").query_opt("offset", offset.as_deref());
            let page: BasePage = self.api.send(&request).await?;
            bases.extend(page.bases);
            match page.offset {
                Some(next) if offset.as_deref() == Some(next.as_str()) => {
                    tracing::warn!(offset = %next, "base list repeated its offset; stopping");
                    break;
                }
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        Ok(BaseList(bases))
    }

    pub async fn schema(&self, base_id: &str) -> Result<Schema, ApiError> {
        let base_id = validate_base_id(base_id)?;
        let request = ApiRequest::get("meta/bases").segment(base_id).segment("tables");
        self.api.send(&request).await
    }

    /// Fields of one table, found in the base schema by ID or name.
    pub async fn fields(&self, base_id: &str, table: &str) -> Result<FieldList, ApiError> {
        self.schema(base_id)
            .await?
            .into_table(table)
            .map(FieldList::from)
            .ok_or_else(|| ApiError::NotFound(format!("table '{table}' in base {base_id}")))
    }

    /// Records of `table`, following pages until exhausted or `max_records` is reached.
    pub async fn list_records(
        &self, base_id: &str, table: &str, options: &ListOptions,
    ) -> Result<RecordList, ApiError> {
        let base = records_request(ApiRequest::get, base_id, table)?;
        options.validate()?;

        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let request = options.apply(base.clone()).query_opt("offset", offset.as_deref());
            let page: RecordPage = self.api.send(&request).await?;
            tracing::debug!(table, fetched = page.records.len(), more = page.offset.is_some(), "record page");
            records.extend(page.records);

            if let Some(max) = options.max_records
                && records.len() >= max as usize
            {
                records.truncate(max as usize);
                break;
            }
            match page.offset {
                Some(next) if offset.as_deref() == Some(next.as_str()) => {
                    tracing::warn!(table, offset = %next, "record list repeated its offset; stopping");
                    break;
                }
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        Ok(RecordList(records))
    }

    pub async fn get_record(&self, base_id: &str, table: &str, record_id: &str) -> Result<Record, ApiError> {
        let record_id = validate_record_id(record_id)?;
        let request = records_request(ApiRequest::get, base_id, table)?.segment(record_id);
        self.api.send(&request).await
    }

    /// Create records in batches of [`MAX_RECORDS_PER_REQUEST`].
    ///
    /// Creation is not idempotent. A batch retried after a 5xx or a timeout
    /// may already have been applied, so it can create duplicate records.
    /// Set `max_retries` to 0 where duplicates are unacceptable.
    pub async fn create_records(
        &self, base_id: &str, table: &str, records: &[Fields], typecast: bool,
    ) -> Result<RecordList, ApiError> {
        let base = records_request(ApiRequest::post, base_id, table)?;
        let mut created = Vec::with_capacity(records.len());
        for chunk in records.chunks(MAX_RECORDS_PER_REQUEST) {
            let body = CreateBody { records: chunk.iter().map(|fields| NewRecord { fields }).collect(), typecast };
            let request = base.clone().json(&body)?;
            let batch: RecordBatch = self.api.send(&request).await?;
            created.extend(batch.records);
        }
        Ok(RecordList(created))
    }

    /// Patch one record's fields.
    pub async fn update_record(
        &self, base_id: &str, table: &str, record_id: &str, fields: &Fields, typecast: bool,
    ) -> Result<Record, ApiError> {
        let record_id = validate_record_id(record_id)?;
        let body = serde_json::json!({ "fields": fields, "typecast": typecast });
        let request = records_request(ApiRequest::patch, base_id, table)?
            .segment(record_id)
            .json(&body)?;
        self.api.send(&request).await
    }

    /// Patch many records in batches of [`MAX_RECORDS_PER_REQUEST`].
    pub async fn update_records(
        &self, base_id: &str, table: &str, updates: &[RecordUpdate], typecast: bool,
    ) -> Result<RecordList, ApiError> {
        let base = records_request(ApiRequest::patch, base_id, table)?;
        for update in updates {
            validate_record_id(&update.id)?;
        }
        let mut updated = Vec::with_capacity(updates.len());
        for chunk in updates.chunks(MAX_RECORDS_PER_REQUEST) {
            let request = base.clone().json(&UpdateBody { records: chunk, typecast })?;
            let batch: RecordBatch = self.api.send(&request).await?;
            updated.extend(batch.records);
        }
        Ok(RecordList(updated))
    }

    /// Update records matching on `merge_on` fields, creating the rest.
    ///
    /// A retried batch re-matches on `merge_on`, so records already written are
    /// updated rather than duplicated, unless the merge fields are not unique in
    /// the table. Records without a match in that case may still be created twice.
    pub async fn upsert_records(
        &self, base_id: &str, table: &str, records: &[Fields], merge_on: &[String], typecast: bool,
    ) -> Result<RecordList, ApiError> {
        if merge_on.is_empty() {
            return Err(ApiError::InvalidInput("upsert needs at least one field to merge on".to_string()));
        }
        let base = records_request(ApiRequest::patch, base_id, table)?;
        let mut written = Vec::with_capacity(records.len());
        for chunk in records.chunks(MAX_RECORDS_PER_REQUEST) {
            let body = UpsertBody {
                perform_upsert: MergeOn { fields_to_merge_on: merge_on },
                records: chunk.iter().map(|fields| NewRecord { fields }).collect(),
                typecast,
            };
            let request = base.clone().json(&body)?;
            let batch: RecordBatch = self.api.send(&request).await?;
            written.extend(batch.records);
        }
        Ok(RecordList(written))
    }

    /// Delete records in batches of [`MAX_RECORDS_PER_REQUEST`].
    pub async fn delete_records(
        &self, base_id: &str, table: &str, record_ids: &[String],
    ) -> Result<DeletedList, ApiError> {
        let base = records_request(ApiRequest::delete, base_id, table)?;
        if record_ids.is_empty() {
            return Err(ApiError::InvalidInput("no record IDs given".to_string()));
        }
        for id in record_ids {
            validate_record_id(id)?;
        }

        let mut deleted = Vec::with_capacity(record_ids.len());
        for chunk in record_ids.chunks(MAX_RECORDS_PER_REQUEST) {
            let request = chunk.iter().fold(base.clone(), |req, id| req.query("records[]", id));
            let batch: DeleteBatch = self.api.send(&request).await?;
            deleted.extend(batch.records);
        }
        Ok(DeletedList(deleted))
    }
}

/// `/{base}/{table}` request with the base ID and table name validated.
fn records_request(method: fn(&str) -> ApiRequest, base_id: &str, table: &str) -> Result<ApiRequest, ApiError> {
    let base_id = validate_base_id(base_id)?;
    let table = validate_table(table)?;
    Ok(method("").segment(base_id).segment(table))
}
