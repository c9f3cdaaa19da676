use super::access::RoleStageAccess;
use super::{apply, Transition};
use crate::db::ApplicationStore;
use crate::error::ServiceError;
use crate::models::PermitApplication;
use crate::validation::{parse_stage, validate_remark};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Drives applications through the authority chain.
#[derive(Clone)]
pub struct WorkflowEngine<S> {
    store: S,
    access: Arc<RoleStageAccess>,
}

impl<S: ApplicationStore> WorkflowEngine<S> {
    pub fn new(store: S, access: RoleStageAccess) -> Self {
        Self {
            store,
            access: Arc::new(access),
        }
    }

    /// Perform one transition on application `id`.
    ///
    /// `expected_version`, when given, must match the stored record. The write
    /// itself is always conditional on the version that was read, so a
    /// concurrent writer surfaces as [`ServiceError::Conflict`] instead of
    /// being silently overwritten.
    pub async fn advance(
        &self,
        id: Uuid,
        transition: Transition,
        text: String,
        expected_version: Option<i64>,
    ) -> Result<PermitApplication, ServiceError> {
        validate_remark(transition.rule().field, &text)?;

        let mut app = self
            .store
            .fetch(id)
            .await?
            .ok_or_else(|| ServiceError::application_not_found(id))?;

        if expected_version.is_some_and(|v| v != app.version) {
            return Err(ServiceError::Conflict(id));
        }

        let read_version = app.version;
        let from = app.current_stage;
        apply(&mut app, transition, text, Utc::now())?;
        let saved = self.store.update(app, read_version).await?;

        tracing::info!(
            "Application {} {}: {} -> {} ({})",
            id,
            transition,
            from,
            saved.current_stage,
            saved.status
        );
        if saved.current_stage.is_terminal() {
            tracing::info!("Application {} closed as {}", id, saved.status);
        }

        Ok(saved)
    }

    /// Applications waiting in `stage`, subject to the caller's role.
    ///
    /// The role gate runs on the raw name before it is parsed as a stage.
    pub async fn inbox(
        &self,
        stage: &str,
        role_id: Option<&str>,
    ) -> Result<Vec<PermitApplication>, ServiceError> {
        self.access.check(role_id, stage)?;
        let stage = parse_stage(stage)?;

        let apps = self.store.list_by_stage(stage).await?;
        tracing::debug!("Inbox {} returned {} applications", stage, apps.len());
        Ok(apps)
    }
}
