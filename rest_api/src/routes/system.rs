// rest_api/src/routes/system.rs

use axum::{extract::State, routing::get, Router};
use serde_json::{json, Value};

use models::labels::Labeled;
use models::medical::{
    AppointmentDuration, AppointmentPriority, AppointmentStatus, AppointmentType, BloodType,
    Department, Gender, Role, Specialty,
};

use super::{data, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check_handler))
        .route("/version", get(version_handler))
        .route("/labels", get(labels_handler))
}

async fn health_check_handler(State(state): State<AppState>) -> ApiResult<Value> {
    data(json!({
        "status": "ok",
        "storage_engine": state.db.store().engine_type().to_string(),
        "realtime_subscribers": state.db.events().subscriber_count(),
    }))
}

async fn version_handler() -> ApiResult<Value> {
    data(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn options<T: Labeled>() -> Value {
    T::options()
        .into_iter()
        .map(|(index, label)| json!({ "value": index, "label": label }))
        .collect()
}

/// Index and label of every stored enum, for select inputs.
async fn labels_handler() -> ApiResult<Value> {
    data(json!({
        "specialty": options::<Specialty>(),
        "department": options::<Department>(),
        "gender": options::<Gender>(),
        "blood_type": options::<BloodType>(),
        "appointment_type": options::<AppointmentType>(),
        "appointment_priority": options::<AppointmentPriority>(),
        "appointment_duration": options::<AppointmentDuration>(),
        "appointment_status": options::<AppointmentStatus>(),
        "role": options::<Role>(),
    }))
}
