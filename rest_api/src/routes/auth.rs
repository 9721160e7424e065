// rest_api/src/routes/auth.rs

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};

use models::medical::{Login, NewUser, PublicUser};
use security::Session;

use super::{created, data, ApiResult, CreatedResult};
use crate::extract::{ApiJson, CurrentUser};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register_user_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/me", get(me_handler))
        .route("/admins", get(list_admins_handler))
}

async fn register_user_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewUser>,
) -> CreatedResult<PublicUser> {
    let user = state.users.register(&payload).await?;
    created(PublicUser::from(&user))
}

async fn login_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Login>,
) -> ApiResult<Session> {
    data(state.users.login(&payload).await?)
}

async fn me_handler(current: CurrentUser) -> ApiResult<PublicUser> {
    data(current.user)
}

/// Administrators a patient can open a support chat with.
async fn list_admins_handler(State(state): State<AppState>, _current: CurrentUser) -> ApiResult<Vec<PublicUser>> {
    data(state.users.admins().await?)
}
