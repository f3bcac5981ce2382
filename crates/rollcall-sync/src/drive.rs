//! Google Drive and Sheets API client
//!
//! Reads roster documents with a caller-provided OAuth access token. Google
//! Sheets are exported as CSV; plain CSV files are downloaded as-is. XLSX
//! files can be detected but not synced.

use rollcall_core::Table;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Result, SyncError};

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

const METADATA_TIMEOUT: Duration = Duration::from_secs(20);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);

/// What kind of document the Drive file id points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Native Google Sheet
    Sheet,
    /// CSV file stored on Drive
    Csv,
    /// Excel workbook (detected, not syncable)
    Xlsx,
}

impl SourceKind {
    /// Classify a Drive MIME type
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/vnd.google-apps.spreadsheet" => Some(SourceKind::Sheet),
            "text/csv" => Some(SourceKind::Csv),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Some(SourceKind::Xlsx)
            }
            _ => None,
        }
    }
}

/// Drive file metadata
#[derive(Debug, Clone, Deserialize)]
pub struct FileMetadata {
    /// File id
    pub id: String,
    /// File name
    pub name: String,
    /// MIME type
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Size in bytes (absent for native Google documents)
    #[serde(default)]
    pub size: Option<String>,
}

impl FileMetadata {
    /// Source kind of this file, if it is one we recognize
    #[must_use]
    pub fn kind(&self) -> Option<SourceKind> {
        SourceKind::from_mime(&self.mime_type)
    }
}

fn status_error(status: u16, context: &str) -> SyncError {
    let message = match status {
        401 => "invalid or expired token".to_string(),
        403 => "no permission to access the file".to_string(),
        404 => "file not found".to_string(),
        _ => context.to_string(),
    };
    SyncError::Drive { status, message }
}

/// HTTP client for the Drive and Sheets APIs
#[derive(Clone, Default)]
pub struct DriveClient {
    client: reqwest::Client,
}

impl DriveClient {
    /// Create a client
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Fetch file metadata (name, MIME type, size)
    pub async fn file_metadata(&self, file_id: &str, access_token: &str) -> Result<FileMetadata> {
        let url = format!("{DRIVE_API_BASE}/files/{file_id}");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("fields", "id,name,mimeType,size"),
                ("supportsAllDrives", "true"),
            ])
            .timeout(METADATA_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status.as_u16(), "error fetching metadata"));
        }

        let metadata: FileMetadata = resp
            .json()
            .await
            .map_err(|e| SyncError::Parse(format!("invalid metadata response: {e}")))?;
        debug!(file = %metadata.name, mime = %metadata.mime_type, "fetched drive metadata");
        Ok(metadata)
    }

    /// Download the roster content as CSV text. Google Sheets are exported;
    /// CSV files are fetched directly; XLSX is rejected.
    pub async fn download(
        &self,
        file_id: &str,
        access_token: &str,
        kind: SourceKind,
    ) -> Result<String> {
        let request = match kind {
            SourceKind::Sheet => self
                .client
                .get(format!("{DRIVE_API_BASE}/files/{file_id}/export"))
                .query(&[("mimeType", "text/csv"), ("supportsAllDrives", "true")]),
            SourceKind::Csv => self
                .client
                .get(format!("{DRIVE_API_BASE}/files/{file_id}"))
                .query(&[("alt", "media"), ("supportsAllDrives", "true")]),
            SourceKind::Xlsx => {
                return Err(SyncError::Unsupported(
                    "xlsx workbooks cannot be synced, convert to a Google Sheet".to_string(),
                ));
            }
        };

        let resp = request
            .bearer_auth(access_token)
            .timeout(TRANSFER_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status.as_u16(), "error downloading roster"));
        }

        Ok(resp.text().await?)
    }

    /// Overwrite a Drive CSV file with new content (media upload)
    pub async fn update_csv(&self, file_id: &str, access_token: &str, content: &str) -> Result<()> {
        let url = format!("{DRIVE_UPLOAD_BASE}/files/{file_id}");
        let resp = self
            .client
            .patch(&url)
            .bearer_auth(access_token)
            .query(&[("uploadType", "media"), ("supportsAllDrives", "true")])
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(content.to_string())
            .timeout(TRANSFER_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status.as_u16(), "error updating csv"));
        }
        info!(file_id = %file_id, "drive csv updated");
        Ok(())
    }

    /// Overwrite the first sheet of a spreadsheet with the table contents:
    /// clear everything, then write headers plus rows from A1.
    pub async fn update_sheet(
        &self,
        spreadsheet_id: &str,
        access_token: &str,
        table: &Table,
    ) -> Result<()> {
        let sheet_title = self.first_sheet_title(spreadsheet_id, access_token).await?;

        let clear_url = format!(
            "{SHEETS_API_BASE}/spreadsheets/{spreadsheet_id}/values/{sheet_title}:clear"
        );
        let resp = self
            .client
            .post(&clear_url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({}))
            .timeout(METADATA_TIMEOUT)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(status_error(resp.status().as_u16(), "error clearing sheet"));
        }

        let mut values: Vec<Vec<String>> = Vec::with_capacity(table.rows.len() + 1);
        values.push(table.headers.clone());
        values.extend(table.rows.iter().cloned());

        let batch_url = format!("{SHEETS_API_BASE}/spreadsheets/{spreadsheet_id}/values:batchUpdate");
        let body = serde_json::json!({
            "valueInputOption": "RAW",
            "data": [{
                "range": format!("{sheet_title}!A1"),
                "values": values,
            }],
        });
        let resp = self
            .client
            .post(&batch_url)
            .bearer_auth(access_token)
            .json(&body)
            .timeout(TRANSFER_TIMEOUT)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(status_error(resp.status().as_u16(), "error writing sheet"));
        }
        info!(spreadsheet_id = %spreadsheet_id, rows = table.rows.len(), "sheet updated");
        Ok(())
    }

    async fn first_sheet_title(&self, spreadsheet_id: &str, access_token: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct SpreadsheetInfo {
            #[serde(default)]
            sheets: Vec<SheetInfo>,
        }
        #[derive(Deserialize)]
        struct SheetInfo {
            properties: SheetProperties,
        }
        #[derive(Deserialize)]
        struct SheetProperties {
            title: String,
        }

        let url = format!("{SHEETS_API_BASE}/spreadsheets/{spreadsheet_id}");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("fields", "sheets.properties")])
            .timeout(METADATA_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status.as_u16(), "error reading spreadsheet"));
        }

        let info: SpreadsheetInfo = resp
            .json()
            .await
            .map_err(|e| SyncError::Parse(format!("invalid spreadsheet response: {e}")))?;
        info.sheets
            .into_iter()
            .next()
            .map(|s| s.properties.title)
            .ok_or_else(|| SyncError::Parse("spreadsheet has no sheets".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_from_mime() {
        assert_eq!(
            SourceKind::from_mime("application/vnd.google-apps.spreadsheet"),
            Some(SourceKind::Sheet)
        );
        assert_eq!(SourceKind::from_mime("text/csv"), Some(SourceKind::Csv));
        assert_eq!(
            SourceKind::from_mime(
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            ),
            Some(SourceKind::Xlsx)
        );
        assert_eq!(SourceKind::from_mime("application/pdf"), None);
    }

    #[test]
    fn test_metadata_parsing() {
        let metadata: FileMetadata = serde_json::from_str(
            r#"{"id":"abc","name":"Roster 2026","mimeType":"application/vnd.google-apps.spreadsheet"}"#,
        )
        .unwrap();
        assert_eq!(metadata.kind(), Some(SourceKind::Sheet));
        assert!(metadata.size.is_none());
    }

    #[test]
    fn test_status_error_mapping() {
        match status_error(401, "ctx") {
            SyncError::Drive { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("token"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        match status_error(500, "error downloading roster") {
            SyncError::Drive { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "error downloading roster");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
