use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::{
    handlers::{self, collections, recipes, reviews, users},
    metrics_handler,
    state::AppState,
};

pub fn observability_routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler::metrics_endpoint))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health_check))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
}

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/api/recipes/:id",
            get(recipes::get_recipe)
                .put(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route("/api/recipes/:id/reviews", get(recipes::list_recipe_reviews))
}

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reviews", post(reviews::create_review))
        .route(
            "/api/reviews/:id",
            get(reviews::get_review)
                .put(reviews::update_review)
                .delete(reviews::delete_review),
        )
}

pub fn collection_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/collections",
            get(collections::list_collections).post(collections::create_collection),
        )
        .route(
            "/api/collections/:id",
            get(collections::get_collection)
                .put(collections::update_collection)
                .delete(collections::delete_collection),
        )
        .route(
            "/api/collections/:id/recipes",
            post(collections::add_collection_recipe),
        )
        .route(
            "/api/collections/:id/recipes/:recipe_id",
            delete(collections::remove_collection_recipe),
        )
}
