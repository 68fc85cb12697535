//! Wire types for the spreadsheet service API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body returned by the service on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
}

/// GET /api/v1/sheets/{name}/values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetValuesResponse {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// POST /api/v1/sheets/{name}/values request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteValuesRequest {
    pub clear_first: bool,
    pub rows: Vec<Vec<Value>>,
}

/// POST /api/v1/sheets/{name}/values response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteValuesResponse {
    pub updated_count: usize,
}
