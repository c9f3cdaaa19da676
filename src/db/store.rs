use crate::models::{PermitApplication, WorkflowStage};
use std::future::Future;
use uuid::Uuid;

/// Row store behind the workflow engine and application service.
///
/// Writes are guarded by the record's `version`: `update` only succeeds when
/// the stored version still equals `expected_version`, and bumps it by one.
pub trait ApplicationStore: Clone + Send + Sync + 'static {
    fn insert(
        &self,
        application: PermitApplication,
    ) -> impl Future<Output = Result<PermitApplication, StoreError>> + Send;

    fn fetch(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<PermitApplication>, StoreError>> + Send;

    fn list_all(&self) -> impl Future<Output = Result<Vec<PermitApplication>, StoreError>> + Send;

    fn list_by_user(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<PermitApplication>, StoreError>> + Send;

    fn list_by_stage(
        &self,
        stage: WorkflowStage,
    ) -> impl Future<Output = Result<Vec<PermitApplication>, StoreError>> + Send;

    fn update(
        &self,
        application: PermitApplication,
        expected_version: i64,
    ) -> impl Future<Output = Result<PermitApplication, StoreError>> + Send;

    /// Returns whether a row was removed.
    fn delete(&self, id: Uuid) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn user_exists(&self, user_id: i64) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("application {0} not found")]
    NotFound(Uuid),
    #[error("application {0} changed since it was read")]
    Conflict(Uuid),
    #[error("{0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        StoreError::Unavailable(value.to_string())
    }
}
