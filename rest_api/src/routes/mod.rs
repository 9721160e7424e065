// rest_api/src/routes/mod.rs

mod appointments;
mod auth;
mod chats;
mod checkups;
mod doctors;
mod files;
mod patients;
mod system;

use axum::{http::StatusCode, Json, Router};
use serde::Serialize;

use crate::error::RestApiError;
use crate::state::AppState;

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct DataBody<T> {
    pub data: T,
}

pub type ApiResult<T> = Result<Json<DataBody<T>>, RestApiError>;
pub type CreatedResult<T> = Result<(StatusCode, Json<DataBody<T>>), RestApiError>;

pub fn data<T>(value: T) -> ApiResult<T> {
    Ok(Json(DataBody { data: value }))
}

pub fn created<T>(value: T) -> CreatedResult<T> {
    Ok((StatusCode::CREATED, Json(DataBody { data: value })))
}

/// Every `/api/v1` route.
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(system::routes())
        .merge(auth::routes())
        .merge(doctors::routes())
        .merge(checkups::routes())
        .merge(patients::routes())
        .merge(appointments::routes())
        .merge(files::routes(max_upload_bytes))
        .merge(chats::routes())
}
