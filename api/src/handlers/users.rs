use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::{CreateUserRequest, NewUser, UpdateUserRequest};

use super::not_found;
use crate::{
    error::ApiResult,
    password::hash_password,
    state::AppState,
    validation::ValidatedJson,
};

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let password_hash = hash_password(&req.password)
        .map_err(|err| state.normalizer.internal("create_user", err))?;

    let user = state
        .store
        .create_user(NewUser {
            username: req.username,
            email: req.email,
            password_hash,
            bio: req.bio,
        })
        .await
        .map_err(|err| state.normalizer.store("create_user", err))?;

    tracing::info!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let users = state
        .store
        .list_users()
        .await
        .map_err(|err| state.normalizer.store("list_users", err))?;
    Ok(Json(users))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id.map_err(|err| state.normalizer.path("get_user", err))?;
    let user = state
        .store
        .get_user(&id)
        .await
        .map_err(|err| state.normalizer.store("get_user", err))?
        .ok_or_else(|| not_found("User"))?;
    Ok(Json(user))
}

/// PUT /api/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id.map_err(|err| state.normalizer.path("update_user", err))?;
    let user = state
        .store
        .update_user(&id, req)
        .await
        .map_err(|err| state.normalizer.store("update_user", err))?
        .ok_or_else(|| not_found("User"))?;
    Ok(Json(user))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id.map_err(|err| state.normalizer.path("delete_user", err))?;
    let deleted = state
        .store
        .delete_user(&id)
        .await
        .map_err(|err| state.normalizer.store("delete_user", err))?;
    if !deleted {
        return Err(not_found("User"));
    }
    tracing::info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
