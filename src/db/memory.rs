use super::store::{ApplicationStore, StoreError};
use crate::models::{PermitApplication, WorkflowStage};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Process-local store used by tests and the `memory` storage backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    applications: HashMap<Uuid, PermitApplication>,
    /// `None` accepts every user id.
    users: Option<HashSet<i64>>,
}

impl MemoryStore {
    /// Store that only knows the given applicant ids.
    #[cfg(test)]
    pub fn with_users(users: impl IntoIterator<Item = i64>) -> Self {
        let inner = Inner {
            applications: HashMap::new(),
            users: Some(users.into_iter().collect()),
        };
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    /// Store that treats any user id as an existing applicant.
    pub fn accepting_any_user() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> Result<T, StoreError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(f(&guard))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> Result<T, StoreError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(f(&mut guard))
    }

    fn collect(&self, keep: impl Fn(&PermitApplication) -> bool) -> Result<Vec<PermitApplication>, StoreError> {
        self.read(|inner| {
            let mut apps: Vec<_> = inner
                .applications
                .values()
                .filter(|app| keep(app))
                .cloned()
                .collect();
            apps.sort_by_key(|app| app.created_at);
            apps
        })
    }
}

impl ApplicationStore for MemoryStore {
    async fn insert(&self, app: PermitApplication) -> Result<PermitApplication, StoreError> {
        self.write(|inner| {
            inner.applications.insert(app.id, app.clone());
            app
        })
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<PermitApplication>, StoreError> {
        self.read(|inner| inner.applications.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<PermitApplication>, StoreError> {
        self.collect(|_| true)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<PermitApplication>, StoreError> {
        self.collect(|app| app.user_id == user_id)
    }

    async fn list_by_stage(
        &self,
        stage: WorkflowStage,
    ) -> Result<Vec<PermitApplication>, StoreError> {
        self.collect(|app| app.current_stage == stage)
    }

    async fn update(
        &self,
        mut app: PermitApplication,
        expected_version: i64,
    ) -> Result<PermitApplication, StoreError> {
        self.write(|inner| {
            let stored = inner
                .applications
                .get_mut(&app.id)
                .ok_or(StoreError::NotFound(app.id))?;
            if stored.version != expected_version {
                return Err(StoreError::Conflict(app.id));
            }
            app.version = expected_version + 1;
            app.created_at = stored.created_at;
            *stored = app.clone();
            Ok(app)
        })?
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.write(|inner| inner.applications.remove(&id).is_some())
    }

    async fn user_exists(&self, user_id: i64) -> Result<bool, StoreError> {
        self.read(|inner| {
            inner
                .users
                .as_ref()
                .map_or(true, |users| users.contains(&user_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreatePermitApplication;
    use chrono::Utc;
    use tokio_test::{assert_err, assert_ok};

    fn application(user_id: i64) -> PermitApplication {
        PermitApplication::submitted(
            CreatePermitApplication {
                user_id,
                event_title: "Ningol Chakouba".to_string(),
                purpose: "Family gathering".to_string(),
                start_date_time: None,
                end_date_time: None,
                permit_type: "PRIVATE_EVENT".to_string(),
                location_tag: "Thoubal".to_string(),
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let store = MemoryStore::accepting_any_user();
        let app = assert_ok!(store.insert(application(1)).await);

        let mut changed = app.clone();
        changed.purpose = "Updated".to_string();
        let updated = assert_ok!(store.update(changed, app.version).await);

        assert_eq!(updated.version, app.version + 1);
        assert_eq!(updated.purpose, "Updated");
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = MemoryStore::accepting_any_user();
        let app = assert_ok!(store.insert(application(1)).await);

        assert_ok!(store.update(app.clone(), app.version).await);
        let err = assert_err!(store.update(app.clone(), app.version).await);
        assert!(matches!(err, StoreError::Conflict(id) if id == app.id));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::accepting_any_user();
        let app = application(1);
        let err = assert_err!(store.update(app.clone(), 1).await);
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_lookup_by_field() {
        let store = MemoryStore::accepting_any_user();
        let mine = assert_ok!(store.insert(application(1)).await);
        assert_ok!(store.insert(application(2)).await);

        let by_user = assert_ok!(store.list_by_user(1).await);
        assert_eq!(by_user, vec![mine]);
        assert_eq!(assert_ok!(store.list_all().await).len(), 2);
        assert_eq!(
            assert_ok!(store.list_by_stage(WorkflowStage::DcPending).await).len(),
            2
        );
        assert!(assert_ok!(store.list_by_stage(WorkflowStage::Completed).await).is_empty());
    }

    #[tokio::test]
    async fn test_known_users() {
        let store = MemoryStore::with_users([4, 5]);
        assert!(assert_ok!(store.user_exists(4).await));
        assert!(!assert_ok!(store.user_exists(6).await));
        assert!(assert_ok!(MemoryStore::accepting_any_user().user_exists(6).await));
    }
}
