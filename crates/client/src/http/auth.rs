//! How a credential is attached to outgoing requests.

use std::fmt;

use reqwest::RequestBuilder;
use toolbelt_core::config::mask_secret;

/// Credential placement. Each provider dictates one.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Auth {
    #[default]
    None,
    /// `Authorization: Bearer <token>` (xAI, Airtable PAT).
    Bearer(String),
    /// A custom header such as `X-Api-Key`.
    Header { name: String, value: String },
    /// A query parameter such as OpenWeatherMap's `appid`.
    Query { name: String, value: String },
}

impl Auth {
    pub fn bearer(token: impl Into<String>) -> Self {
        Auth::Bearer(token.into())
    }

    pub fn query(name: impl Into<String>, value: impl Into<String>) -> Self {
        Auth::Query { name: name.into(), value: value.into() }
    }

    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Auth::Header { name: name.into(), value: value.into() }
    }

    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Auth::None => request,
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Header { name, value } => request.header(name.as_str(), value.as_str()),
            Auth::Query { name, value } => request.query(&[(name.as_str(), value.as_str())]),
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Bearer(token) => f.debug_tuple("Bearer").field(&mask_secret(token)).finish(),
            Auth::Header { name, value } => {
                f.debug_struct("Header").field("name", name).field("value", &mask_secret(value)).finish()
            }
            Auth::Query { name, value } => {
                f.debug_struct("Query").field("name", name).field("value", &mask_secret(value)).finish()
            }
        }
    }
}
