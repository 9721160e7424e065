// rest_api/src/routes/checkups.rs

use axum::{extract::State, routing::get, Router};

use lib::filters::CheckupFilter;
use lib::Page;
use models::medical::HospitalCheckup;
use models::{DocumentId, Stored};
use security::Permission;

use super::{created, data, ApiResult, CreatedResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/checkups", get(list_checkups_handler).post(create_checkup_handler))
        .route(
            "/checkups/:id",
            get(get_checkup_handler)
                .put(update_checkup_handler)
                .delete(delete_checkup_handler),
        )
}

async fn list_checkups_handler(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<CheckupFilter>,
) -> ApiResult<Page<Stored<HospitalCheckup>>> {
    let query = filter.to_query()?;
    data(state.db.repository::<HospitalCheckup>().list(&query).await?)
}

async fn get_checkup_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<Stored<HospitalCheckup>> {
    data(state.db.repository::<HospitalCheckup>().get(&id).await?)
}

async fn create_checkup_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<HospitalCheckup>,
) -> CreatedResult<Stored<HospitalCheckup>> {
    current.require(Permission::ManageRecords)?;
    created(state.db.repository::<HospitalCheckup>().create(&payload).await?)
}

async fn update_checkup_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
    ApiJson(payload): ApiJson<HospitalCheckup>,
) -> ApiResult<Stored<HospitalCheckup>> {
    current.require(Permission::ManageRecords)?;
    data(state.db.repository::<HospitalCheckup>().update(&id, &payload).await?)
}

async fn delete_checkup_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<Stored<HospitalCheckup>> {
    current.require(Permission::ManageRecords)?;
    data(state.db.repository::<HospitalCheckup>().delete(&id).await?)
}
