// rest_api/src/routes/patients.rs

use axum::{extract::State, routing::get, Router};

use lib::filters::PatientFilter;
use lib::Page;
use models::medical::Patient;
use models::{DocumentId, Stored};
use security::Permission;

use super::{created, data, ApiResult, CreatedResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list_patients_handler).post(create_patient_handler))
        .route(
            "/patients/:id",
            get(get_patient_handler)
                .put(update_patient_handler)
                .delete(delete_patient_handler),
        )
}

async fn list_patients_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(filter): ApiQuery<PatientFilter>,
) -> ApiResult<Page<Stored<Patient>>> {
    current.require(Permission::ReadRecords)?;
    let query = filter.to_query()?;
    data(state.db.repository::<Patient>().list(&query).await?)
}

async fn get_patient_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<Stored<Patient>> {
    current.require(Permission::ReadRecords)?;
    data(state.db.repository::<Patient>().get(&id).await?)
}

async fn create_patient_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<Patient>,
) -> CreatedResult<Stored<Patient>> {
    current.require(Permission::ManageRecords)?;
    created(state.db.repository::<Patient>().create(&payload).await?)
}

async fn update_patient_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
    ApiJson(payload): ApiJson<Patient>,
) -> ApiResult<Stored<Patient>> {
    current.require(Permission::ManageRecords)?;
    data(state.db.repository::<Patient>().update(&id, &payload).await?)
}

async fn delete_patient_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<Stored<Patient>> {
    current.require(Permission::ManageRecords)?;
    data(state.db.repository::<Patient>().delete(&id).await?)
}
