// rest_api/src/routes/files.rs

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap, HeaderValue,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde::Deserialize;

use lib::StoredFile;
use models::DocumentId;
use security::Permission;

use super::{created, data, ApiResult, CreatedResult};
use crate::error::RestApiError;
use crate::extract::{ApiPath, ApiQuery, CurrentUser};
use crate::state::AppState;

/// Added to the upload limit for the transport body limit; the store
/// enforces the exact limit.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// File routes, with axum's default body limit raised to the upload limit.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/files", post(upload_file_handler))
        .route(
            "/files/:id",
            get(download_file_handler).delete(delete_file_handler),
        )
        .route("/files/:id/meta", get(file_metadata_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes.saturating_add(BODY_LIMIT_SLACK)))
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    name: String,
}

/// Raw body upload: `POST /files?name=photo.png` with the file's content type.
async fn upload_file_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(params): ApiQuery<UploadParams>,
    headers: HeaderMap,
    body: Result<Bytes, axum::extract::rejection::BytesRejection>,
) -> CreatedResult<StoredFile> {
    current.require(Permission::ManageRecords)?;
    let body = body?;
    let mime_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    created(state.files.upload(&params.name, mime_type, body).await?)
}

async fn file_metadata_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<StoredFile> {
    data(state.files.metadata(&id).await?)
}

/// Public so marketing pages can embed doctor and checkup images.
async fn download_file_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DocumentId>,
) -> Result<Response, RestApiError> {
    let (meta, content) = state.files.download(&id).await?;
    let content_type = HeaderValue::from_str(&meta.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!("inline; filename=\"{}\"", meta.name.replace('"', "")))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));
    Ok(([(CONTENT_TYPE, content_type), (CONTENT_DISPOSITION, disposition)], content).into_response())
}

async fn delete_file_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<DocumentId> {
    current.require(Permission::ManageRecords)?;
    state.files.delete(&id).await?;
    data(id)
}
