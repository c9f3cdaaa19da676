//! Permit document storage
//!
//! Each application carries at most one PDF. Files live under a configured
//! upload root as `<uuid>_<original name>`; the returned path string is what
//! gets persisted on the application record.

use crate::error::ServiceError;
use crate::validation::validate_pdf_upload;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Fallback name used in response headers when none was recorded.
pub const DEFAULT_DOCUMENT_NAME: &str = "document.pdf";

/// A file received from a client, before validation.
#[derive(Debug, Clone, Default)]
pub struct PdfUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Where an accepted upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub path: String,
    pub original_file_name: String,
}

/// Bytes and display name of a stored document.
#[derive(Debug, Clone)]
pub struct DocumentContent {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// How a document is handed to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Attachment,
    Inline,
}

impl Disposition {
    pub fn header_value(self, file_name: &str) -> String {
        let kind = match self {
            Disposition::Attachment => "attachment",
            Disposition::Inline => "inline",
        };
        format!("{}; filename=\"{}\"", kind, header_safe_filename(file_name))
    }
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    upload_root: PathBuf,
    max_upload_size: usize,
}

impl DocumentStore {
    pub fn new(upload_root: impl Into<PathBuf>, max_upload_size: usize) -> Self {
        Self {
            upload_root: upload_root.into(),
            max_upload_size,
        }
    }

    pub fn max_upload_size(&self) -> usize {
        self.max_upload_size
    }

    /// Validate and write an uploaded PDF, returning its storage path.
    pub async fn store(&self, upload: &PdfUpload) -> Result<StoredDocument, ServiceError> {
        validate_pdf_upload(
            upload.content_type.as_deref(),
            upload.file_name.as_deref(),
            upload.data.len(),
            self.max_upload_size,
        )?;

        let original_file_name = upload.file_name.clone().unwrap_or_default();
        let storage_name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(&original_file_name));

        fs::create_dir_all(&self.upload_root).await.map_err(|e| {
            tracing::error!(
                "Failed to create upload directory {:?}: {} (kind: {:?})",
                self.upload_root,
                e,
                e.kind()
            );
            ServiceError::Storage(e)
        })?;

        let file_path = self.upload_root.join(&storage_name);
        fs::write(&file_path, &upload.data).await.map_err(|e| {
            tracing::error!(
                "Failed to write file {:?}: {} (kind: {:?})",
                file_path,
                e,
                e.kind()
            );
            ServiceError::Storage(e)
        })?;

        tracing::info!(
            "Stored permit document {:?} ({} bytes)",
            file_path,
            upload.data.len()
        );

        Ok(StoredDocument {
            path: file_path.to_string_lossy().into_owned(),
            original_file_name,
        })
    }

    /// Read a stored document for download or inline viewing.
    pub async fn read(
        &self,
        stored_path: &str,
        file_name: Option<&str>,
    ) -> Result<DocumentContent, ServiceError> {
        let absolute = resolve_path(stored_path).map_err(ServiceError::Storage)?;

        let data = match fs::read(&absolute).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ServiceError::NotFound(format!(
                    "Document file not found at path: {}",
                    absolute.display()
                )));
            }
            Err(e) => return Err(ServiceError::Storage(e)),
        };

        let file_name = file_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_DOCUMENT_NAME)
            .to_string();

        Ok(DocumentContent { file_name, data })
    }

    /// Best-effort removal of a stored document. Never fails; problems are
    /// logged and reported as `false`.
    pub async fn delete(&self, stored_path: &str) -> bool {
        if stored_path.trim().is_empty() {
            return false;
        }

        let absolute = match resolve_path(stored_path) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Could not resolve document path {}: {}", stored_path, e);
                return false;
            }
        };

        match fs::remove_file(&absolute).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to delete document {:?}: {}", absolute, e);
                false
            }
        }
    }
}

/// Resolve a stored path against the working directory. Absolute paths are
/// returned unchanged.
pub fn resolve_path(stored_path: &str) -> std::io::Result<PathBuf> {
    let path = Path::new(stored_path);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

fn sanitize_filename(filename: &str) -> String {
    // Extract only the basename (strip any directory components)
    let basename = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = basename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Remove leading dots (prevent hidden files / traversal like ..pdf)
    let sanitized = sanitized.trim_start_matches('.');

    if sanitized.is_empty() {
        DEFAULT_DOCUMENT_NAME.to_string()
    } else {
        sanitized.to_string()
    }
}

fn header_safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
