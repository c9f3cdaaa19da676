//! HTTP request handlers

pub mod applications;
pub mod authority;
pub mod middleware;

use crate::applications::ApplicationService;
use crate::db::ApplicationStore;
use crate::error::ServiceError;
use crate::models::ApiResponse;
use crate::workflow::WorkflowEngine;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

/// Room for multipart framing and the JSON part on top of the file itself.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState<S> {
    pub applications: ApplicationService<S>,
    pub workflow: WorkflowEngine<S>,
    pub is_production: bool,
}

/// Largest request body the API accepts for a given upload limit.
pub fn body_limit(max_upload_size: usize) -> usize {
    max_upload_size.saturating_add(MULTIPART_OVERHEAD)
}

pub fn router<S: ApplicationStore>(state: AppState<S>) -> Router {
    let limit = body_limit(state.applications.documents().max_upload_size());

    let application_routes = Router::new()
        .route(
            "/",
            post(applications::create_application::<S>).get(applications::list_applications::<S>),
        )
        .route(
            "/with-pdf",
            post(applications::create_application_with_pdf::<S>),
        )
        .route(
            "/:id",
            get(applications::get_application::<S>)
                .put(applications::update_application::<S>)
                .delete(applications::delete_application::<S>),
        )
        .route(
            "/user/:user_id",
            get(applications::list_user_applications::<S>),
        )
        .route(
            "/:id/download-document",
            get(applications::download_document::<S>),
        )
        .route(
            "/:id/view-document",
            get(applications::view_document::<S>),
        );

    let authority_routes = Router::new()
        .route("/inbox/:stage", get(authority::inbox::<S>))
        .route("/dc/forward-sp/:id", put(authority::dc_forward_to_sp::<S>))
        .route(
            "/sp/forward-sdpo/:id",
            put(authority::sp_forward_to_sdpo::<S>),
        )
        .route(
            "/sdpo/forward-oc/:id",
            put(authority::sdpo_forward_to_oc::<S>),
        )
        .route("/oc/report/:id", put(authority::oc_report::<S>))
        .route(
            "/sdpo/forward-sp/:id",
            put(authority::sdpo_forward_to_sp::<S>),
        )
        .route(
            "/sp/recommend-dc/:id",
            put(authority::sp_recommend_to_dc::<S>),
        )
        .route("/dc/approve/:id", put(authority::dc_approve::<S>))
        .route("/dc/reject/:id", put(authority::dc_reject::<S>));

    let api_routes = Router::new()
        .route("/health", get(health))
        .nest("/permit-applications", application_routes)
        .nest("/authority", authority_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::security_headers::<S>,
        ))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Turn a service failure into the API envelope. Server-side failures are
/// logged and reported without internals.
pub(crate) fn error_response<T>(err: ServiceError) -> (StatusCode, Json<ApiResponse<T>>) {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
        return (status, Json(ApiResponse::error("Internal server error")));
    }

    tracing::debug!("Request rejected ({}): {}", status, err);
    (status, Json(ApiResponse::error(err.to_string())))
}
