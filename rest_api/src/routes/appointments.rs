// rest_api/src/routes/appointments.rs

use axum::{extract::State, routing::get, Router};

use lib::filters::AppointmentFilter;
use lib::Page;
use models::medical::Appointment;
use models::{DocumentId, Stored};
use security::Permission;

use super::{created, data, ApiResult, CreatedResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/appointments",
            get(list_appointments_handler).post(create_appointment_handler),
        )
        .route(
            "/appointments/:id",
            get(get_appointment_handler)
                .put(update_appointment_handler)
                .delete(delete_appointment_handler),
        )
}

async fn list_appointments_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(filter): ApiQuery<AppointmentFilter>,
) -> ApiResult<Page<Stored<Appointment>>> {
    current.require(Permission::ReadRecords)?;
    let query = filter.to_query()?;
    data(state.appointments.repository().list(&query).await?)
}

async fn get_appointment_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<Stored<Appointment>> {
    current.require(Permission::ReadRecords)?;
    data(state.appointments.repository().get(&id).await?)
}

async fn create_appointment_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<Appointment>,
) -> CreatedResult<Stored<Appointment>> {
    current.require(Permission::ManageRecords)?;
    created(state.appointments.book(&payload).await?)
}

async fn update_appointment_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
    ApiJson(payload): ApiJson<Appointment>,
) -> ApiResult<Stored<Appointment>> {
    current.require(Permission::ManageRecords)?;
    data(state.appointments.reschedule(&id, &payload).await?)
}

async fn delete_appointment_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<Stored<Appointment>> {
    current.require(Permission::ManageRecords)?;
    data(state.appointments.repository().delete(&id).await?)
}
