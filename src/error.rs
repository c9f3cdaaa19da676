//! Error taxonomy shared by the workflow engine, document store and handlers

use crate::db::StoreError;
use crate::validation::ValidationError;
use crate::workflow::InvalidTransition;
use axum::http::StatusCode;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    InvalidInput(#[from] ValidationError),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Application {0} was modified concurrently; reload it and retry")]
    Conflict(Uuid),

    #[error("File storage failure: {0}")]
    Storage(#[source] std::io::Error),

    #[error("Storage unavailable: {0}")]
    Database(String),
}

impl ServiceError {
    pub fn application_not_found(id: Uuid) -> Self {
        ServiceError::NotFound(format!("Application not found with id: {}", id))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::InvalidTransition(_) | ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Storage(_) | ServiceError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => ServiceError::application_not_found(id),
            StoreError::Conflict(id) => ServiceError::Conflict(id),
            StoreError::Unavailable(message) => ServiceError::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkflowStage;
    use crate::workflow::Transition;

    #[test]
    fn test_status_codes() {
        let id = Uuid::new_v4();
        assert_eq!(
            ServiceError::application_not_found(id).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::from(ValidationError::EmptyFile).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Forbidden("no".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::from(InvalidTransition {
                transition: Transition::ApproveByDc,
                stage: WorkflowStage::DcPending,
            })
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::from(StoreError::Conflict(id)).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::from(StoreError::Unavailable("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message_names_the_id() {
        let id = Uuid::new_v4();
        let message = ServiceError::from(StoreError::NotFound(id)).to_string();
        assert_eq!(message, format!("Application not found with id: {}", id));
    }
}
