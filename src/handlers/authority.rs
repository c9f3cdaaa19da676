//! Authority endpoints: stage inboxes and the workflow transitions

use crate::db::ApplicationStore;
use crate::handlers::{error_response, AppState};
use crate::models::*;
use crate::workflow::{RemarkField, Transition};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

/// Header carrying the caller's role id for inbox access checks.
pub const ROLE_HEADER: &str = "X-Role-Id";

/// Applications currently waiting in a stage
pub async fn inbox<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Path(stage): Path<String>,
) -> impl IntoResponse {
    let role_id = headers.get(ROLE_HEADER).and_then(|v| v.to_str().ok());

    match state.workflow.inbox(&stage, role_id).await {
        Ok(apps) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                apps.into_iter()
                    .map(PermitApplicationResponse::from)
                    .collect::<Vec<_>>(),
            )),
        ),
        Err(e) => error_response(e),
    }
}

async fn act<S: ApplicationStore>(
    state: &AppState<S>,
    id: Uuid,
    transition: Transition,
    body: AuthorityActionRequest,
) -> (StatusCode, Json<ApiResponse<PermitApplicationResponse>>) {
    let text = match transition.rule().field {
        RemarkField::OcReport => body.report,
        _ => body.remarks,
    }
    .unwrap_or_default();

    match state
        .workflow
        .advance(id, transition, text, body.expected_version)
        .await
    {
        Ok(app) => (StatusCode::OK, Json(ApiResponse::success(app.into()))),
        Err(e) => error_response(e),
    }
}

/// DC forwards a new application to the SP
pub async fn dc_forward_to_sp<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AuthorityActionRequest>,
) -> impl IntoResponse {
    act(&state, id, Transition::ForwardToSp, body).await
}

pub async fn sp_forward_to_sdpo<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AuthorityActionRequest>,
) -> impl IntoResponse {
    act(&state, id, Transition::ForwardToSdpo, body).await
}

pub async fn sdpo_forward_to_oc<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AuthorityActionRequest>,
) -> impl IntoResponse {
    act(&state, id, Transition::ForwardToOc, body).await
}

/// OC files the site report; reads `report` rather than `remarks`
pub async fn oc_report<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AuthorityActionRequest>,
) -> impl IntoResponse {
    act(&state, id, Transition::SubmitOcReport, body).await
}

pub async fn sdpo_forward_to_sp<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AuthorityActionRequest>,
) -> impl IntoResponse {
    act(&state, id, Transition::ForwardToSpFromSdpo, body).await
}

pub async fn sp_recommend_to_dc<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AuthorityActionRequest>,
) -> impl IntoResponse {
    act(&state, id, Transition::RecommendToDc, body).await
}

pub async fn dc_approve<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AuthorityActionRequest>,
) -> impl IntoResponse {
    act(&state, id, Transition::ApproveByDc, body).await
}

pub async fn dc_reject<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AuthorityActionRequest>,
) -> impl IntoResponse {
    act(&state, id, Transition::RejectByDc, body).await
}
