// rest_api/src/routes/doctors.rs

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};

use lib::filters::DoctorFilter;
use lib::{import_doctors_csv, ImportReport, Page};
use models::medical::{Doctor, NewDoctor};
use models::{DocumentId, Stored};
use security::Permission;

use super::{created, data, ApiResult, CreatedResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/doctors", get(list_doctors_handler).post(create_doctor_handler))
        .route(
            "/doctors/:id",
            get(get_doctor_handler)
                .put(update_doctor_handler)
                .delete(delete_doctor_handler),
        )
        .route("/doctors/import", post(import_doctors_handler))
}

async fn list_doctors_handler(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<DoctorFilter>,
) -> ApiResult<Page<Stored<Doctor>>> {
    let query = filter.to_query()?;
    data(state.db.repository::<Doctor>().list(&query).await?)
}

async fn get_doctor_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<Stored<Doctor>> {
    data(state.db.repository::<Doctor>().get(&id).await?)
}

async fn create_doctor_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<NewDoctor>,
) -> CreatedResult<Stored<Doctor>> {
    current.require(Permission::ManageRecords)?;
    let doctor = payload.into_doctor()?;
    created(state.db.repository::<Doctor>().create(&doctor).await?)
}

async fn update_doctor_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
    ApiJson(payload): ApiJson<NewDoctor>,
) -> ApiResult<Stored<Doctor>> {
    current.require(Permission::ManageRecords)?;
    let doctor = payload.into_doctor()?;
    data(state.db.repository::<Doctor>().update(&id, &doctor).await?)
}

async fn delete_doctor_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<Stored<Doctor>> {
    current.require(Permission::ManageRecords)?;
    data(state.db.repository::<Doctor>().delete(&id).await?)
}

/// CSV body, one doctor per row.
async fn import_doctors_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    body: String,
) -> ApiResult<ImportReport> {
    current.require(Permission::ManageRecords)?;
    data(import_doctors_csv(&state.db.repository::<Doctor>(), &body).await?)
}
