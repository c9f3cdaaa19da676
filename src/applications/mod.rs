//! Permit application lifecycle outside the authority workflow
//!
//! Creation (with or without a PDF), lookups, field edits and deletion. The
//! only cross-cutting rule here is the attachment ordering: a file is written
//! before the record that references it, and removed (best effort) before the
//! record that owned it.

use crate::db::ApplicationStore;
use crate::documents::{DocumentStore, PdfUpload};
use crate::error::ServiceError;
use crate::models::{CreatePermitApplication, PermitApplication, UpdatePermitApplication};
use crate::validation::{validate_create_application, validate_update_application};
use chrono::Utc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ApplicationService<S> {
    store: S,
    documents: DocumentStore,
}

impl<S: ApplicationStore> ApplicationService<S> {
    pub fn new(store: S, documents: DocumentStore) -> Self {
        Self { store, documents }
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub async fn create(
        &self,
        input: CreatePermitApplication,
    ) -> Result<PermitApplication, ServiceError> {
        validate_create_application(&input)?;
        self.ensure_user(input.user_id).await?;

        let app = self
            .store
            .insert(PermitApplication::submitted(input, Utc::now()))
            .await?;
        tracing::info!(
            "Application {} created for user {}",
            app.id,
            app.user_id
        );
        Ok(app)
    }

    pub async fn create_with_pdf(
        &self,
        input: CreatePermitApplication,
        upload: PdfUpload,
    ) -> Result<PermitApplication, ServiceError> {
        validate_create_application(&input)?;
        self.ensure_user(input.user_id).await?;

        let stored = self.documents.store(&upload).await?;

        let mut app = PermitApplication::submitted(input, Utc::now());
        app.document_path = Some(stored.path.clone());
        app.document_file_name = Some(stored.original_file_name);

        match self.store.insert(app).await {
            Ok(app) => {
                tracing::info!(
                    "Application {} created for user {} with document {}",
                    app.id,
                    app.user_id,
                    stored.path
                );
                Ok(app)
            }
            Err(e) => {
                tracing::error!("Failed to store application record: {}", e);
                if !self.documents.delete(&stored.path).await {
                    tracing::warn!("Orphaned document left at {}", stored.path);
                }
                Err(e.into())
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<PermitApplication, ServiceError> {
        self.store
            .fetch(id)
            .await?
            .ok_or_else(|| ServiceError::application_not_found(id))
    }

    pub async fn list_all(&self) -> Result<Vec<PermitApplication>, ServiceError> {
        Ok(self.store.list_all().await?)
    }

    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<PermitApplication>, ServiceError> {
        self.ensure_user(user_id).await?;
        Ok(self.store.list_by_user(user_id).await?)
    }

    /// Apply a partial edit. Status may only be rewritten to the label that
    /// belongs to the record's current stage; stage moves go through the
    /// workflow engine.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdatePermitApplication,
    ) -> Result<PermitApplication, ServiceError> {
        let mut app = self.get(id).await?;
        if input.expected_version.is_some_and(|v| v != app.version) {
            return Err(ServiceError::Conflict(id));
        }
        validate_update_application(&input, &app)?;

        let read_version = app.version;
        if let Some(title) = input.event_title {
            app.event_title = title;
        }
        if let Some(purpose) = input.purpose {
            app.purpose = purpose;
        }
        if let Some(start) = input.start_date_time {
            app.start_date_time = Some(start);
        }
        if let Some(end) = input.end_date_time {
            app.end_date_time = Some(end);
        }
        if let Some(permit_type) = input.permit_type {
            app.permit_type = permit_type;
        }
        if let Some(location_tag) = input.location_tag {
            app.location_tag = location_tag;
        }
        if let Some(status) = input.status {
            app.status = status;
        }
        app.updated_at = Utc::now();

        let updated = self.store.update(app, read_version).await?;
        tracing::info!("Application {} updated", id);
        Ok(updated)
    }

    /// Delete an application and, best effort, its stored document.
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let app = self.get(id).await?;

        if let Some(path) = app.document_path.as_deref().filter(|p| !p.is_empty()) {
            if self.documents.delete(path).await {
                tracing::info!("Document deleted: {}", path);
            } else {
                tracing::warn!("Document could not be deleted: {}", path);
            }
        }

        if !self.store.delete(id).await? {
            return Err(ServiceError::application_not_found(id));
        }

        tracing::info!("Application {} deleted", id);
        Ok(())
    }

    async fn ensure_user(&self, user_id: i64) -> Result<(), ServiceError> {
        if self.store.user_exists(user_id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!(
                "User not found with id {}",
                user_id
            )))
        }
    }
}
