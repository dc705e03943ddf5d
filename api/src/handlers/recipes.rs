use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::{CreateRecipeRequest, RecipeFilter, UpdateRecipeRequest};

use super::not_found;
use crate::{error::ApiResult, state::AppState, validation::ValidatedJson};

/// POST /api/recipes
pub async fn create_recipe(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateRecipeRequest>,
) -> ApiResult<impl IntoResponse> {
    let recipe = state
        .store
        .create_recipe(req)
        .await
        .map_err(|err| state.normalizer.store("create_recipe", err))?;

    tracing::info!(recipe_id = %recipe.id, "recipe created");
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// GET /api/recipes?author=&tag=&q=
pub async fn list_recipes(
    State(state): State<AppState>,
    filter: Result<Query<RecipeFilter>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(filter) = filter.map_err(|err| state.normalizer.query("list_recipes", err))?;
    let recipes = state
        .store
        .list_recipes(filter)
        .await
        .map_err(|err| state.normalizer.store("list_recipes", err))?;
    Ok(Json(recipes))
}

/// GET /api/recipes/:id
pub async fn get_recipe(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id.map_err(|err| state.normalizer.path("get_recipe", err))?;
    let recipe = state
        .store
        .get_recipe(&id)
        .await
        .map_err(|err| state.normalizer.store("get_recipe", err))?
        .ok_or_else(|| not_found("Recipe"))?;
    Ok(Json(recipe))
}

/// PUT /api/recipes/:id
pub async fn update_recipe(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    ValidatedJson(req): ValidatedJson<UpdateRecipeRequest>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id.map_err(|err| state.normalizer.path("update_recipe", err))?;
    let recipe = state
        .store
        .update_recipe(&id, req)
        .await
        .map_err(|err| state.normalizer.store("update_recipe", err))?
        .ok_or_else(|| not_found("Recipe"))?;
    Ok(Json(recipe))
}

/// DELETE /api/recipes/:id
pub async fn delete_recipe(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id.map_err(|err| state.normalizer.path("delete_recipe", err))?;
    let deleted = state
        .store
        .delete_recipe(&id)
        .await
        .map_err(|err| state.normalizer.store("delete_recipe", err))?;
    if !deleted {
        return Err(not_found("Recipe"));
    }
    tracing::info!(recipe_id = %id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/recipes/:id/reviews
pub async fn list_recipe_reviews(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id.map_err(|err| state.normalizer.path("list_recipe_reviews", err))?;
    state
        .store
        .get_recipe(&id)
        .await
        .map_err(|err| state.normalizer.store("list_recipe_reviews", err))?
        .ok_or_else(|| not_found("Recipe"))?;

    let reviews = state
        .store
        .list_reviews_for_recipe(&id)
        .await
        .map_err(|err| state.normalizer.store("list_recipe_reviews", err))?;
    Ok(Json(reviews))
}
