//! Storage layer.
//!
//! Handlers talk to persistence only through [`RecipeStore`]. Backends take
//! identifiers as the raw strings clients sent and do the conversion
//! themselves, so a malformed id comes back as `StoreError::Reference` from
//! here and never as a handler-side parse error.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use shared::{
    Collection, CreateCollectionRequest, CreateRecipeRequest, CreateReviewRequest, NewUser,
    Recipe, RecipeFilter, Review, StoreError, StoreResult, UpdateCollectionRequest,
    UpdateRecipeRequest, UpdateReviewRequest, UpdateUserRequest, User,
};
use uuid::Uuid;

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Cheap liveness probe for the health endpoint.
    async fn ping(&self) -> StoreResult<()>;

    // Users
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn get_user(&self, id: &str) -> StoreResult<Option<User>>;
    async fn update_user(&self, id: &str, changes: UpdateUserRequest) -> StoreResult<Option<User>>;
    async fn delete_user(&self, id: &str) -> StoreResult<bool>;

    // Recipes
    async fn create_recipe(&self, recipe: CreateRecipeRequest) -> StoreResult<Recipe>;
    async fn list_recipes(&self, filter: RecipeFilter) -> StoreResult<Vec<Recipe>>;
    async fn get_recipe(&self, id: &str) -> StoreResult<Option<Recipe>>;
    async fn update_recipe(
        &self,
        id: &str,
        changes: UpdateRecipeRequest,
    ) -> StoreResult<Option<Recipe>>;
    async fn delete_recipe(&self, id: &str) -> StoreResult<bool>;

    // Reviews
    async fn create_review(&self, review: CreateReviewRequest) -> StoreResult<Review>;
    async fn list_reviews_for_recipe(&self, recipe_id: &str) -> StoreResult<Vec<Review>>;
    async fn get_review(&self, id: &str) -> StoreResult<Option<Review>>;
    async fn update_review(
        &self,
        id: &str,
        changes: UpdateReviewRequest,
    ) -> StoreResult<Option<Review>>;
    async fn delete_review(&self, id: &str) -> StoreResult<bool>;

    // Collections
    async fn create_collection(&self, collection: CreateCollectionRequest)
        -> StoreResult<Collection>;
    async fn list_collections(&self) -> StoreResult<Vec<Collection>>;
    async fn get_collection(&self, id: &str) -> StoreResult<Option<Collection>>;
    async fn update_collection(
        &self,
        id: &str,
        changes: UpdateCollectionRequest,
    ) -> StoreResult<Option<Collection>>;
    async fn delete_collection(&self, id: &str) -> StoreResult<bool>;
    async fn add_recipe_to_collection(
        &self,
        id: &str,
        recipe_id: &str,
    ) -> StoreResult<Option<Collection>>;
    async fn remove_recipe_from_collection(
        &self,
        id: &str,
        recipe_id: &str,
    ) -> StoreResult<Option<Collection>>;
}

/// Convert a client-supplied identifier, tagging failures as references.
pub fn parse_id(path: &str, raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| StoreError::malformed_id(path, raw))
}

fn parse_ids(path: &str, raw: &[String]) -> StoreResult<Vec<Uuid>> {
    let mut ids: Vec<Uuid> = Vec::with_capacity(raw.len());
    for value in raw {
        let id = parse_id(path, value)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_accepts_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id("id", &id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_parse_id_rejects_garbage_as_reference() {
        let err = parse_id("id", "507f1f77bcf86cd79943901z").unwrap_err();
        assert!(matches!(err, StoreError::Reference(_)));
    }

    #[test]
    fn test_parse_ids_dedupes_in_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let raw = vec![a.to_string(), b.to_string(), a.to_string()];
        assert_eq!(parse_ids("recipes", &raw).unwrap(), vec![a, b]);
    }
}
