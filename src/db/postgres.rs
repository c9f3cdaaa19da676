use super::store::{ApplicationStore, StoreError};
use crate::models::{PermitApplication, WorkflowStage};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ApplicationStore for PgStore {
    async fn insert(&self, app: PermitApplication) -> Result<PermitApplication, StoreError> {
        let inserted = sqlx::query_as::<_, PermitApplication>(
            r#"
            INSERT INTO permit_applications (
                id, user_id, event_title, purpose, start_date_time, end_date_time,
                permit_type, location_tag, document_path, document_file_name,
                status, current_stage, dc_remarks, sp_remarks, sdpo_remarks, oc_report,
                remark_log, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING *
            "#,
        )
        .bind(app.id)
        .bind(app.user_id)
        .bind(&app.event_title)
        .bind(&app.purpose)
        .bind(app.start_date_time)
        .bind(app.end_date_time)
        .bind(&app.permit_type)
        .bind(&app.location_tag)
        .bind(&app.document_path)
        .bind(&app.document_file_name)
        .bind(app.status)
        .bind(app.current_stage)
        .bind(&app.dc_remarks)
        .bind(&app.sp_remarks)
        .bind(&app.sdpo_remarks)
        .bind(&app.oc_report)
        .bind(&app.remark_log)
        .bind(app.version)
        .bind(app.created_at)
        .bind(app.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<PermitApplication>, StoreError> {
        let app = sqlx::query_as::<_, PermitApplication>(
            "SELECT * FROM permit_applications WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(app)
    }

    async fn list_all(&self) -> Result<Vec<PermitApplication>, StoreError> {
        let apps = sqlx::query_as::<_, PermitApplication>(
            "SELECT * FROM permit_applications ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(apps)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<PermitApplication>, StoreError> {
        let apps = sqlx::query_as::<_, PermitApplication>(
            "SELECT * FROM permit_applications WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(apps)
    }

    async fn list_by_stage(
        &self,
        stage: WorkflowStage,
    ) -> Result<Vec<PermitApplication>, StoreError> {
        let apps = sqlx::query_as::<_, PermitApplication>(
            "SELECT * FROM permit_applications WHERE current_stage = $1 ORDER BY created_at",
        )
        .bind(stage)
        .fetch_all(&self.pool)
        .await?;

        Ok(apps)
    }

    async fn update(
        &self,
        app: PermitApplication,
        expected_version: i64,
    ) -> Result<PermitApplication, StoreError> {
        // The version predicate turns a lost race into zero affected rows.
        let updated = sqlx::query_as::<_, PermitApplication>(
            r#"
            UPDATE permit_applications SET
                event_title = $2,
                purpose = $3,
                start_date_time = $4,
                end_date_time = $5,
                permit_type = $6,
                location_tag = $7,
                document_path = $8,
                document_file_name = $9,
                status = $10,
                current_stage = $11,
                dc_remarks = $12,
                sp_remarks = $13,
                sdpo_remarks = $14,
                oc_report = $15,
                remark_log = $16,
                updated_at = $17,
                version = version + 1
            WHERE id = $1 AND version = $18
            RETURNING *
            "#,
        )
        .bind(app.id)
        .bind(&app.event_title)
        .bind(&app.purpose)
        .bind(app.start_date_time)
        .bind(app.end_date_time)
        .bind(&app.permit_type)
        .bind(&app.location_tag)
        .bind(&app.document_path)
        .bind(&app.document_file_name)
        .bind(app.status)
        .bind(app.current_stage)
        .bind(&app.dc_remarks)
        .bind(&app.sp_remarks)
        .bind(&app.sdpo_remarks)
        .bind(&app.oc_report)
        .bind(&app.remark_log)
        .bind(app.updated_at)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(row) => Ok(row),
            None => {
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM permit_applications WHERE id = $1)",
                )
                .bind(app.id)
                .fetch_one(&self.pool)
                .await?;

                if exists {
                    Err(StoreError::Conflict(app.id))
                } else {
                    Err(StoreError::NotFound(app.id))
                }
            }
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM permit_applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn user_exists(&self, user_id: i64) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE user_id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }
}
