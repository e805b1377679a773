//! Request/response contract of the upload web surface.
//!
//! The web server is not part of this crate. These functions take the already-received form
//! fields (the multipart file is expected to be stored on disk) and return the status code and
//! JSON body the server should answer with, so any HTTP framework can mount them:
//!
//! | route | success | conflict | bad request | failure |
//! |---|---|---|---|---|
//! | `GET /table-exists?name=` | 200 `{success, exists, tableName}` | - | 400 | 500 |
//! | `POST /upload` | 200 `{success, message, tableName, rows, columns, rejectedRows}` | 409 `{success, message, tableExists, tableName}` | 400 | 500 `{success, message}` |

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::IngestionError;
use crate::ingestion::{ingest_from_path, IngestionFormat, IngestionOptions, TableRequest};
use crate::schema::table_name_for;
use crate::store::RelationalStore;

/// File extensions accepted at the upload boundary.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];

/// A status code and JSON body ready to be written to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Value,
}

impl HttpReply {
    fn json(status: u16, body: impl Serialize) -> Self {
        let body = serde_json::to_value(body).unwrap_or_else(|e| {
            serde_json::json!({ "success": false, "message": e.to_string() })
        });
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fields of an upload form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    /// Client-side name of the uploaded file; its extension selects the reader.
    pub file_name: Option<String>,
    /// Where the server stored the uploaded bytes.
    pub file_path: Option<PathBuf>,
    /// Optional target table name.
    pub table_name: Option<String>,
    /// Raw `forceOverwrite` field; only the exact string `"true"` enables overwrite.
    pub force_overwrite: Option<String>,
}

impl UploadForm {
    pub fn force_overwrite(&self) -> bool {
        self.force_overwrite.as_deref() == Some("true")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadSuccess<'a> {
    success: bool,
    message: &'a str,
    table_name: &'a str,
    rows: usize,
    columns: Vec<String>,
    rejected_rows: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadConflict<'a> {
    success: bool,
    message: String,
    table_exists: bool,
    table_name: &'a str,
}

#[derive(Serialize)]
struct Failure {
    success: bool,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TableExists<'a> {
    success: bool,
    exists: bool,
    table_name: &'a str,
}

#[derive(Serialize)]
struct TableExistsFailure {
    success: bool,
    message: String,
    exists: bool,
}

/// Handle `POST /upload`.
pub fn handle_upload(
    store: &dyn RelationalStore,
    form: &UploadForm,
    options: &IngestionOptions,
) -> HttpReply {
    let (file_name, file_path) = match (&form.file_name, &form.file_path) {
        (Some(name), Some(path)) => (name.as_str(), path.as_path()),
        _ => return failure(400, "No file uploaded".to_string()),
    };
    let format = match accepted_format(file_name) {
        Ok(f) => f,
        Err(e) => return failure(e.status_code(), e.to_string()),
    };

    let request = TableRequest::new(form.table_name.as_deref(), form.force_overwrite());
    let options = IngestionOptions {
        format: Some(format),
        ..options.clone()
    };

    match ingest_from_path(store, file_path, &request, &options) {
        Ok(report) => HttpReply::json(
            200,
            UploadSuccess {
                success: true,
                message: &report.message,
                table_name: &report.table_name,
                rows: report.rows_inserted,
                columns: report.column_names(),
                rejected_rows: report.rows_rejected,
            },
        ),
        Err(e @ IngestionError::Conflict { .. }) => {
            let table = request.effective_table_name();
            HttpReply::json(
                409,
                UploadConflict {
                    success: false,
                    message: e.to_string(),
                    table_exists: true,
                    table_name: &table,
                },
            )
        }
        Err(e) => failure(e.status_code(), e.to_string()),
    }
}

/// Handle `GET /table-exists?name=<tableName>`.
///
/// The name is normalized the same way uploads normalize it.
pub fn handle_table_exists(store: &dyn RelationalStore, name: Option<&str>) -> HttpReply {
    let Some(name) = name.filter(|n| !n.is_empty()) else {
        return HttpReply::json(
            400,
            TableExistsFailure {
                success: false,
                message: "Table name is required".to_string(),
                exists: false,
            },
        );
    };
    let table = table_name_for(Some(name));

    let exists = store
        .connect()
        .and_then(|mut session| session.table_exists(&table));
    match exists {
        Ok(exists) => HttpReply::json(
            200,
            TableExists {
                success: true,
                exists,
                table_name: &table,
            },
        ),
        Err(e) => {
            tracing::error!(table = %table, error = %e, "table existence check failed");
            HttpReply::json(
                500,
                TableExistsFailure {
                    success: false,
                    message: e.to_string(),
                    exists: false,
                },
            )
        }
    }
}

fn accepted_format(file_name: &str) -> Result<IngestionFormat, IngestionError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(IngestionError::validation(format!(
            "Unsupported file type '{file_name}'; expected one of: {}",
            ACCEPTED_EXTENSIONS.join(", ")
        )));
    }
    IngestionFormat::from_extension(&ext)
        .ok_or_else(|| IngestionError::validation(format!("Unsupported file type '{file_name}'")))
}

fn failure(status: u16, message: String) -> HttpReply {
    if status >= 500 {
        tracing::error!(status, %message, "upload failed");
    }
    HttpReply::json(
        status,
        Failure {
            success: false,
            message,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_overwrite_only_accepts_exact_true() {
        let mut form = UploadForm::default();
        assert!(!form.force_overwrite());
        form.force_overwrite = Some("TRUE".to_string());
        assert!(!form.force_overwrite());
        form.force_overwrite = Some("true".to_string());
        assert!(form.force_overwrite());
    }

    #[test]
    fn extensions_are_checked_case_insensitively() {
        assert_eq!(accepted_format("Q3.XLSX").unwrap(), IngestionFormat::Excel);
        assert_eq!(accepted_format("data.csv").unwrap(), IngestionFormat::Csv);
        assert_eq!(accepted_format("book.xls").unwrap(), IngestionFormat::Excel);
        // Readable by the library, but not accepted at the upload boundary.
        assert_eq!(accepted_format("book.ods").unwrap_err().status_code(), 400);
        assert!(accepted_format("notes").is_err());
    }
}
