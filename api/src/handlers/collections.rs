use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::{AddCollectionRecipeRequest, CreateCollectionRequest, UpdateCollectionRequest};

use super::not_found;
use crate::{error::ApiResult, state::AppState, validation::ValidatedJson};

/// POST /api/collections
pub async fn create_collection(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateCollectionRequest>,
) -> ApiResult<impl IntoResponse> {
    let collection = state
        .store
        .create_collection(req)
        .await
        .map_err(|err| state.normalizer.store("create_collection", err))?;

    tracing::info!(collection_id = %collection.id, "collection created");
    Ok((StatusCode::CREATED, Json(collection)))
}

/// GET /api/collections
pub async fn list_collections(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let collections = state
        .store
        .list_collections()
        .await
        .map_err(|err| state.normalizer.store("list_collections", err))?;
    Ok(Json(collections))
}

/// GET /api/collections/:id
pub async fn get_collection(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id.map_err(|err| state.normalizer.path("get_collection", err))?;
    let collection = state
        .store
        .get_collection(&id)
        .await
        .map_err(|err| state.normalizer.store("get_collection", err))?
        .ok_or_else(|| not_found("Collection"))?;
    Ok(Json(collection))
}

/// PUT /api/collections/:id
pub async fn update_collection(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    ValidatedJson(req): ValidatedJson<UpdateCollectionRequest>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id.map_err(|err| state.normalizer.path("update_collection", err))?;
    let collection = state
        .store
        .update_collection(&id, req)
        .await
        .map_err(|err| state.normalizer.store("update_collection", err))?
        .ok_or_else(|| not_found("Collection"))?;
    Ok(Json(collection))
}

/// DELETE /api/collections/:id
pub async fn delete_collection(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id.map_err(|err| state.normalizer.path("delete_collection", err))?;
    let deleted = state
        .store
        .delete_collection(&id)
        .await
        .map_err(|err| state.normalizer.store("delete_collection", err))?;
    if !deleted {
        return Err(not_found("Collection"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/collections/:id/recipes
pub async fn add_collection_recipe(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    ValidatedJson(req): ValidatedJson<AddCollectionRecipeRequest>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id.map_err(|err| state.normalizer.path("add_collection_recipe", err))?;
    let collection = state
        .store
        .add_recipe_to_collection(&id, &req.recipe)
        .await
        .map_err(|err| state.normalizer.store("add_collection_recipe", err))?
        .ok_or_else(|| not_found("Collection"))?;
    Ok(Json(collection))
}

/// DELETE /api/collections/:id/recipes/:recipe_id
pub async fn remove_collection_recipe(
    State(state): State<AppState>,
    ids: Result<Path<(String, String)>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path((id, recipe_id)) =
        ids.map_err(|err| state.normalizer.path("remove_collection_recipe", err))?;
    let collection = state
        .store
        .remove_recipe_from_collection(&id, &recipe_id)
        .await
        .map_err(|err| state.normalizer.store("remove_collection_recipe", err))?
        .ok_or_else(|| not_found("Collection"))?;
    Ok(Json(collection))
}
