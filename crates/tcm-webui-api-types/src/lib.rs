//! Shared request and response types for the title card web UI JSON API.
//!
//! Series configurations travel as opaque JSON objects; only the envelope is typed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arbitrary nested JSON object used for library definitions and series configurations.
pub type JsonObject = Map<String, Value>;

/// One named series configuration, as exposed over the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: Value,
}

/// `GET /api/config` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigPayload {
    pub libraries: JsonObject,
    pub series: Vec<SeriesEntry>,
}

/// `POST /api/config` request body. A missing `libraries` member leaves the
/// persisted libraries untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigWriteRequest {
    #[serde(default)]
    pub libraries: Option<JsonObject>,
    #[serde(default)]
    pub series: Vec<SeriesEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// `POST /api/preview` request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: Value,
}

/// `POST /api/preview` response: base64-encoded image bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub mime: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Editor metadata for a single series field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: String,
    pub label: String,
    pub path: Vec<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
}

/// `GET /api/meta` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaResponse {
    pub fields: Vec<FieldDescriptor>,
    pub card_types: Vec<Choice>,
    pub font_directory: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontEntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FontEntryKind,
}

/// `GET /api/fonts` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontListing {
    pub path: String,
    pub entries: Vec<FontEntry>,
}

/// A single show returned by the metadata search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: Option<String>,
    pub year: Option<u32>,
    pub library: Option<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub ids: JsonObject,
}

/// `GET /api/plex/search` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}
