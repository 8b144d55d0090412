//! Identity endpoints

use axum::{extract::State, Json};

use crate::{error::AppResult, models::User, AppState};

use super::Caller;

/// Get the current user
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(State(state): State<AppState>, caller: Caller) -> AppResult<Json<User>> {
    let user = state.services.users.me(caller.identity()).await?;
    Ok(Json(user))
}
