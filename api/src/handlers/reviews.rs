use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::{CreateReviewRequest, UpdateReviewRequest};

use super::not_found;
use crate::{error::ApiResult, state::AppState, validation::ValidatedJson};

/// POST /api/reviews
pub async fn create_review(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    let review = state
        .store
        .create_review(req)
        .await
        .map_err(|err| state.normalizer.store("create_review", err))?;

    tracing::info!(review_id = %review.id, recipe_id = %review.recipe, "review created");
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /api/reviews/:id
pub async fn get_review(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id.map_err(|err| state.normalizer.path("get_review", err))?;
    let review = state
        .store
        .get_review(&id)
        .await
        .map_err(|err| state.normalizer.store("get_review", err))?
        .ok_or_else(|| not_found("Review"))?;
    Ok(Json(review))
}

/// PUT /api/reviews/:id
pub async fn update_review(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    ValidatedJson(req): ValidatedJson<UpdateReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id.map_err(|err| state.normalizer.path("update_review", err))?;
    let review = state
        .store
        .update_review(&id, req)
        .await
        .map_err(|err| state.normalizer.store("update_review", err))?
        .ok_or_else(|| not_found("Review"))?;
    Ok(Json(review))
}

/// DELETE /api/reviews/:id
pub async fn delete_review(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id.map_err(|err| state.normalizer.path("delete_review", err))?;
    let deleted = state
        .store
        .delete_review(&id)
        .await
        .map_err(|err| state.normalizer.store("delete_review", err))?;
    if !deleted {
        return Err(not_found("Review"));
    }
    Ok(StatusCode::NO_CONTENT)
}
