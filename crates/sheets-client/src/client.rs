//! HTTP client for the spreadsheet service.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use banca_core::errors::Result as CoreResult;
use banca_core::sync::{SheetInfo, SheetRows, SpreadsheetPort};

use crate::error::{Result, SheetsClientError};
use crate::types::{ApiErrorResponse, SheetValuesResponse, WriteValuesRequest, WriteValuesResponse};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Client for the spreadsheet service REST API.
///
/// The credential determines capability: a read-only token can list and read
/// sheets, while writes require a write-scoped token. The write-capable
/// signal is carried explicitly so the orchestrator can fail fast without a
/// round-trip.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    write_capable: bool,
}

impl SheetsClient {
    /// Create a new spreadsheet client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the service API
    /// * `access_token` - Bearer token; its scope decides `write_capable`
    pub fn new(base_url: &str, access_token: &str, write_capable: bool) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            write_capable,
        }
    }

    /// Create headers for an API request.
    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", self.access_token))
            .map_err(|_| SheetsClientError::auth("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(headers)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(SheetsClientError::api(
                    status.as_u16(),
                    format!("{}: {}", error.code, error.message),
                ));
            }
            return Err(SheetsClientError::api(
                status.as_u16(),
                format!("Request failed: {}", body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            SheetsClientError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    fn sheet_url(&self, sheet: &str, suffix: &str) -> String {
        format!(
            "{}/api/v1/sheets/{}{}",
            self.base_url,
            urlencoding::encode(sheet),
            suffix
        )
    }

    /// List the sheets available to this credential.
    ///
    /// GET /api/v1/sheets
    pub async fn get_sheets(&self) -> Result<Vec<SheetInfo>> {
        let url = format!("{}/api/v1/sheets", self.base_url);
        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Read one sheet's header row and data rows.
    ///
    /// GET /api/v1/sheets/{name}/values
    pub async fn get_values(&self, sheet: &str) -> Result<SheetValuesResponse> {
        let url = self.sheet_url(sheet, "/values");
        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Overwrite a sheet's rows, optionally clearing it first. Fails fast
    /// without a write-scoped credential; the call is never attempted.
    ///
    /// POST /api/v1/sheets/{name}/values
    pub async fn put_values(
        &self,
        sheet: &str,
        rows: Vec<Vec<Value>>,
        clear_first: bool,
    ) -> Result<WriteValuesResponse> {
        if !self.write_capable {
            return Err(SheetsClientError::auth(
                "write-scoped credential required to update sheets",
            ));
        }

        let url = self.sheet_url(sheet, "/values");
        debug!(
            "writing {} row(s) to sheet '{}' (clear_first={})",
            rows.len(),
            sheet,
            clear_first
        );
        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&WriteValuesRequest { clear_first, rows })
            .send()
            .await?;
        Self::parse_response(response).await
    }
}

#[async_trait]
impl SpreadsheetPort for SheetsClient {
    async fn list_sheets(&self) -> CoreResult<Vec<SheetInfo>> {
        Ok(self.get_sheets().await?)
    }

    async fn read_rows(&self, sheet: &str) -> CoreResult<SheetRows> {
        let values = self.get_values(sheet).await?;
        Ok(SheetRows {
            headers: values.headers,
            rows: values.rows,
        })
    }

    async fn write_rows(
        &self,
        sheet: &str,
        rows: &[Vec<Value>],
        clear_first: bool,
    ) -> CoreResult<usize> {
        let response = self.put_values(sheet, rows.to_vec(), clear_first).await?;
        Ok(response.updated_count)
    }

    fn can_write(&self) -> bool {
        self.write_capable
    }
}
