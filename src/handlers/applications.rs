//! Applicant-facing permit application endpoints

use crate::db::ApplicationStore;
use crate::documents::{Disposition, PdfUpload};
use crate::error::ServiceError;
use crate::handlers::{error_response, AppState};
use crate::models::*;
use crate::validation::ValidationError;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn reply(
    status: StatusCode,
    result: Result<PermitApplication, ServiceError>,
) -> Reply<PermitApplicationResponse> {
    match result {
        Ok(app) => (status, Json(ApiResponse::success(app.into()))),
        Err(e) => error_response(e),
    }
}

fn reply_list(
    result: Result<Vec<PermitApplication>, ServiceError>,
) -> Reply<Vec<PermitApplicationResponse>> {
    match result {
        Ok(apps) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                apps.into_iter().map(PermitApplicationResponse::from).collect(),
            )),
        ),
        Err(e) => error_response(e),
    }
}

/// Create an application without a document
pub async fn create_application<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    Json(input): Json<CreatePermitApplication>,
) -> impl IntoResponse {
    reply(StatusCode::CREATED, state.applications.create(input).await)
}

/// Create an application from a multipart form carrying an `application`
/// JSON part and a `file` PDF part
pub async fn create_application_with_pdf<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    multipart: Multipart,
) -> impl IntoResponse {
    let (input, upload) = match read_application_form(multipart).await {
        Ok(parts) => parts,
        Err(rejection) => return rejection,
    };

    tracing::info!(
        "PDF application received from user {}: {:?} ({} bytes)",
        input.user_id,
        upload.file_name,
        upload.data.len()
    );

    reply(
        StatusCode::CREATED,
        state.applications.create_with_pdf(input, upload).await,
    )
}

async fn read_application_form(
    mut multipart: Multipart,
) -> Result<(CreatePermitApplication, PdfUpload), Reply<PermitApplicationResponse>> {
    let mut input = None;
    let mut upload = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_rejection(e)),
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "application" => {
                let text = field.text().await.map_err(multipart_rejection)?;
                let parsed = serde_json::from_str::<CreatePermitApplication>(&text)
                    .map_err(|e| {
                        error_response(
                            ValidationError::Malformed(format!("application part: {}", e)).into(),
                        )
                    })?;
                input = Some(parsed);
            }
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_rejection)?;
                upload = Some(PdfUpload {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let input = input.ok_or_else(|| {
        error_response(ValidationError::Malformed("missing 'application' part".to_string()).into())
    })?;
    let upload = upload.ok_or_else(|| {
        error_response(ValidationError::Malformed("missing 'file' part".to_string()).into())
    })?;

    Ok((input, upload))
}

fn multipart_rejection(e: MultipartError) -> Reply<PermitApplicationResponse> {
    tracing::warn!("Multipart parsing error: {}", e);
    (e.status(), Json(ApiResponse::error(e.body_text())))
}

/// List all applications
pub async fn list_applications<S: ApplicationStore>(
    State(state): State<AppState<S>>,
) -> impl IntoResponse {
    reply_list(state.applications.list_all().await)
}

/// Get one application
pub async fn get_application<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    reply(StatusCode::OK, state.applications.get(id).await)
}

/// List the applications a user has filed
pub async fn list_user_applications<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<i64>,
) -> impl IntoResponse {
    reply_list(state.applications.list_by_user(user_id).await)
}

/// Edit application fields
pub async fn update_application<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePermitApplication>,
) -> impl IntoResponse {
    reply(StatusCode::OK, state.applications.update(id, input).await)
}

/// Delete an application and its document
pub async fn delete_application<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.applications.delete(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success("Application deleted successfully")),
        ),
        Err(e) => error_response(e),
    }
}

pub async fn download_document<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Response {
    serve_document(&state, id, Disposition::Attachment).await
}

pub async fn view_document<S: ApplicationStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Response {
    serve_document(&state, id, Disposition::Inline).await
}

async fn serve_document<S: ApplicationStore>(
    state: &AppState<S>,
    id: Uuid,
    disposition: Disposition,
) -> Response {
    let app = match state.applications.get(id).await {
        Ok(app) => app,
        Err(e) => return error_response::<()>(e).into_response(),
    };

    let Some(path) = app.document_path.as_deref().filter(|p| !p.is_empty()) else {
        return error_response::<()>(ServiceError::NotFound(format!(
            "No document attached to application {}",
            id
        )))
        .into_response();
    };

    match state
        .applications
        .documents()
        .read(path, app.document_file_name.as_deref())
        .await
    {
        Ok(content) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    disposition.header_value(&content.file_name),
                ),
            ],
            content.data,
        )
            .into_response(),
        Err(e) => error_response::<()>(e).into_response(),
    }
}
