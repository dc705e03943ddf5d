use async_trait::async_trait;
use chrono::Utc;
use shared::{
    Collection, CreateCollectionRequest, CreateRecipeRequest, CreateReviewRequest, NewUser,
    Recipe, RecipeFilter, Review, StoreError, StoreResult, UpdateCollectionRequest,
    UpdateRecipeRequest, UpdateReviewRequest, UpdateUserRequest, User,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{parse_id, parse_ids, RecipeStore};

/// Process-local store with the same constraint semantics as the Postgres
/// schema. Used when no database is configured and throughout the tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    recipes: Vec<Recipe>,
    reviews: Vec<Review>,
    collections: Vec<Collection>,
}

impl Tables {
    fn require_user(&self, id: Uuid) -> StoreResult<()> {
        if self.users.iter().any(|u| u.id == id) {
            Ok(())
        } else {
            Err(StoreError::reference(format!(
                "Referenced user {} does not exist",
                id
            )))
        }
    }

    fn require_recipe(&self, id: Uuid) -> StoreResult<()> {
        if self.recipes.iter().any(|r| r.id == id) {
            Ok(())
        } else {
            Err(StoreError::reference(format!(
                "Referenced recipe {} does not exist",
                id
            )))
        }
    }

    fn check_email_free(&self, email: &str, except: Option<Uuid>) -> StoreResult<()> {
        let taken = self
            .users
            .iter()
            .any(|u| u.email == email && Some(u.id) != except);
        if taken {
            return Err(StoreError::validation(format!(
                "email '{}' already exists",
                email
            )));
        }
        Ok(())
    }
}

fn check_username(username: &str) -> StoreResult<()> {
    let len = username.chars().count();
    if !(3..=30).contains(&len) {
        return Err(StoreError::validation(
            "username must be between 3 and 30 characters",
        ));
    }
    Ok(())
}

fn check_recipe(recipe: &Recipe) -> StoreResult<()> {
    if recipe.title.trim().is_empty() {
        return Err(StoreError::validation("title is required"));
    }
    if recipe.ingredients.is_empty() {
        return Err(StoreError::validation("ingredients must not be empty"));
    }
    if recipe.instructions.is_empty() {
        return Err(StoreError::validation("instructions must not be empty"));
    }
    if recipe.cooking_time.is_some_and(|t| !(1..=1440).contains(&t)) {
        return Err(StoreError::validation(
            "cooking_time must be between 1 and 1440",
        ));
    }
    if recipe.servings.is_some_and(|s| !(1..=100).contains(&s)) {
        return Err(StoreError::validation("servings must be between 1 and 100"));
    }
    Ok(())
}

fn check_rating(rating: i32) -> StoreResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(StoreError::validation("rating must be between 1 and 5"));
    }
    Ok(())
}

/// Newest first, matching `ORDER BY created_at DESC` with insertion order
/// as the tiebreak.
fn newest_first<T: Clone>(rows: &[T]) -> Vec<T> {
    rows.iter().rev().cloned().collect()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    // ── Users ───────────────────────────────────────────────────────────────

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        check_username(&user.username)?;
        tables.check_email_free(&user.email, None)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            bio: user.bio,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(newest_first(&self.tables.read().await.users))
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        let id = parse_id("id", id)?;
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_user(&self, id: &str, changes: UpdateUserRequest) -> StoreResult<Option<User>> {
        let id = parse_id("id", id)?;
        let mut tables = self.tables.write().await;

        if !tables.users.iter().any(|u| u.id == id) {
            return Ok(None);
        }
        if let Some(ref username) = changes.username {
            check_username(username)?;
        }
        if let Some(ref email) = changes.email {
            tables.check_email_free(email, Some(id))?;
        }

        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(bio) = changes.bio {
            user.bio = Some(bio);
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        let id = parse_id("id", id)?;
        let mut tables = self.tables.write().await;

        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Ok(false);
        }

        for recipe in tables.recipes.iter_mut() {
            if recipe.author == Some(id) {
                recipe.author = None;
            }
        }
        tables.reviews.retain(|r| r.user != id);
        tables.collections.retain(|c| c.owner != id);
        Ok(true)
    }

    // ── Recipes ─────────────────────────────────────────────────────────────

    async fn create_recipe(&self, recipe: CreateRecipeRequest) -> StoreResult<Recipe> {
        let author = recipe
            .author
            .as_deref()
            .map(|raw| parse_id("author", raw))
            .transpose()?;

        let mut tables = self.tables.write().await;
        if let Some(author) = author {
            tables.require_user(author)?;
        }

        let now = Utc::now();
        let recipe = Recipe {
            id: Uuid::new_v4(),
            title: recipe.title,
            description: recipe.description,
            ingredients: recipe.ingredients,
            instructions: recipe.instructions,
            cooking_time: recipe.cooking_time,
            servings: recipe.servings,
            tags: recipe.tags.unwrap_or_default(),
            author,
            created_at: now,
            updated_at: now,
        };
        check_recipe(&recipe)?;
        tables.recipes.push(recipe.clone());
        Ok(recipe)
    }

    async fn list_recipes(&self, filter: RecipeFilter) -> StoreResult<Vec<Recipe>> {
        let author = filter
            .author
            .as_deref()
            .map(|raw| parse_id("author", raw))
            .transpose()?;
        let needle = filter.q.as_deref().map(str::to_lowercase);

        let tables = self.tables.read().await;
        Ok(tables
            .recipes
            .iter()
            .rev()
            .filter(|r| author.map_or(true, |a| r.author == Some(a)))
            .filter(|r| {
                filter
                    .tag
                    .as_ref()
                    .map_or(true, |tag| r.tags.iter().any(|t| t == tag))
            })
            .filter(|r| {
                needle
                    .as_ref()
                    .map_or(true, |q| r.title.to_lowercase().contains(q.as_str()))
            })
            .cloned()
            .collect())
    }

    async fn get_recipe(&self, id: &str) -> StoreResult<Option<Recipe>> {
        let id = parse_id("id", id)?;
        let tables = self.tables.read().await;
        Ok(tables.recipes.iter().find(|r| r.id == id).cloned())
    }

    async fn update_recipe(
        &self,
        id: &str,
        changes: UpdateRecipeRequest,
    ) -> StoreResult<Option<Recipe>> {
        let id = parse_id("id", id)?;
        let mut tables = self.tables.write().await;

        let Some(recipe) = tables.recipes.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };

        let mut updated = recipe.clone();
        if let Some(title) = changes.title {
            updated.title = title;
        }
        if let Some(description) = changes.description {
            updated.description = description;
        }
        if let Some(ingredients) = changes.ingredients {
            updated.ingredients = ingredients;
        }
        if let Some(instructions) = changes.instructions {
            updated.instructions = instructions;
        }
        if changes.cooking_time.is_some() {
            updated.cooking_time = changes.cooking_time;
        }
        if changes.servings.is_some() {
            updated.servings = changes.servings;
        }
        if let Some(tags) = changes.tags {
            updated.tags = tags;
        }
        check_recipe(&updated)?;

        updated.updated_at = Utc::now();
        *recipe = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_recipe(&self, id: &str) -> StoreResult<bool> {
        let id = parse_id("id", id)?;
        let mut tables = self.tables.write().await;

        let before = tables.recipes.len();
        tables.recipes.retain(|r| r.id != id);
        if tables.recipes.len() == before {
            return Ok(false);
        }

        tables.reviews.retain(|r| r.recipe != id);
        for collection in tables.collections.iter_mut() {
            collection.recipes.retain(|r| *r != id);
        }
        Ok(true)
    }

    // ── Reviews ─────────────────────────────────────────────────────────────

    async fn create_review(&self, review: CreateReviewRequest) -> StoreResult<Review> {
        let recipe = parse_id("recipe", &review.recipe)?;
        let user = parse_id("user", &review.user)?;

        let mut tables = self.tables.write().await;
        tables.require_recipe(recipe)?;
        tables.require_user(user)?;
        check_rating(review.rating)?;

        if tables
            .reviews
            .iter()
            .any(|r| r.recipe == recipe && r.user == user)
        {
            return Err(StoreError::validation(
                "user has already reviewed this recipe",
            ));
        }

        let review = Review {
            id: Uuid::new_v4(),
            recipe,
            user,
            rating: review.rating,
            comment: review.comment,
            created_at: Utc::now(),
        };
        tables.reviews.push(review.clone());
        Ok(review)
    }

    async fn list_reviews_for_recipe(&self, recipe_id: &str) -> StoreResult<Vec<Review>> {
        let recipe = parse_id("recipe", recipe_id)?;
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .iter()
            .rev()
            .filter(|r| r.recipe == recipe)
            .cloned()
            .collect())
    }

    async fn get_review(&self, id: &str) -> StoreResult<Option<Review>> {
        let id = parse_id("id", id)?;
        let tables = self.tables.read().await;
        Ok(tables.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn update_review(
        &self,
        id: &str,
        changes: UpdateReviewRequest,
    ) -> StoreResult<Option<Review>> {
        let id = parse_id("id", id)?;
        if let Some(rating) = changes.rating {
            check_rating(rating)?;
        }

        let mut tables = self.tables.write().await;
        let Some(review) = tables.reviews.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if let Some(rating) = changes.rating {
            review.rating = rating;
        }
        if let Some(comment) = changes.comment {
            review.comment = Some(comment);
        }
        Ok(Some(review.clone()))
    }

    async fn delete_review(&self, id: &str) -> StoreResult<bool> {
        let id = parse_id("id", id)?;
        let mut tables = self.tables.write().await;
        let before = tables.reviews.len();
        tables.reviews.retain(|r| r.id != id);
        Ok(tables.reviews.len() != before)
    }

    // ── Collections ─────────────────────────────────────────────────────────

    async fn create_collection(
        &self,
        collection: CreateCollectionRequest,
    ) -> StoreResult<Collection> {
        let owner = parse_id("owner", &collection.owner)?;
        let recipes = parse_ids("recipes", &collection.recipes.unwrap_or_default())?;

        let mut tables = self.tables.write().await;
        tables.require_user(owner)?;
        for recipe in &recipes {
            tables.require_recipe(*recipe)?;
        }
        if collection.name.trim().is_empty() {
            return Err(StoreError::validation("name is required"));
        }

        let now = Utc::now();
        let collection = Collection {
            id: Uuid::new_v4(),
            name: collection.name,
            description: collection.description,
            owner,
            recipes,
            created_at: now,
            updated_at: now,
        };
        tables.collections.push(collection.clone());
        Ok(collection)
    }

    async fn list_collections(&self) -> StoreResult<Vec<Collection>> {
        Ok(newest_first(&self.tables.read().await.collections))
    }

    async fn get_collection(&self, id: &str) -> StoreResult<Option<Collection>> {
        let id = parse_id("id", id)?;
        let tables = self.tables.read().await;
        Ok(tables.collections.iter().find(|c| c.id == id).cloned())
    }

    async fn update_collection(
        &self,
        id: &str,
        changes: UpdateCollectionRequest,
    ) -> StoreResult<Option<Collection>> {
        let id = parse_id("id", id)?;
        if changes.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(StoreError::validation("name is required"));
        }

        let mut tables = self.tables.write().await;
        let Some(collection) = tables.collections.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            collection.name = name;
        }
        if let Some(description) = changes.description {
            collection.description = Some(description);
        }
        collection.updated_at = Utc::now();
        Ok(Some(collection.clone()))
    }

    async fn delete_collection(&self, id: &str) -> StoreResult<bool> {
        let id = parse_id("id", id)?;
        let mut tables = self.tables.write().await;
        let before = tables.collections.len();
        tables.collections.retain(|c| c.id != id);
        Ok(tables.collections.len() != before)
    }

    async fn add_recipe_to_collection(
        &self,
        id: &str,
        recipe_id: &str,
    ) -> StoreResult<Option<Collection>> {
        let id = parse_id("id", id)?;
        let recipe = parse_id("recipe", recipe_id)?;

        let mut tables = self.tables.write().await;
        if !tables.collections.iter().any(|c| c.id == id) {
            return Ok(None);
        }
        tables.require_recipe(recipe)?;

        let Some(collection) = tables.collections.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if !collection.recipes.contains(&recipe) {
            collection.recipes.push(recipe);
            collection.updated_at = Utc::now();
        }
        Ok(Some(collection.clone()))
    }

    async fn remove_recipe_from_collection(
        &self,
        id: &str,
        recipe_id: &str,
    ) -> StoreResult<Option<Collection>> {
        let id = parse_id("id", id)?;
        let recipe = parse_id("recipe", recipe_id)?;

        let mut tables = self.tables.write().await;
        let Some(collection) = tables.collections.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        collection.recipes.retain(|r| *r != recipe);
        collection.updated_at = Utc::now();
        Ok(Some(collection.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            bio: None,
        }
    }

    fn soup(author: Option<String>) -> CreateRecipeRequest {
        CreateRecipeRequest {
            title: "Soup".to_string(),
            description: "Tasty".to_string(),
            ingredients: vec!["salt".to_string()],
            instructions: vec!["boil".to_string()],
            cooking_time: Some(30),
            servings: None,
            tags: Some(vec!["winter".to_string()]),
            author,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_validation_failure() {
        let store = MemoryStore::new();
        store.create_user(new_user("chef", "chef@example.com")).await.unwrap();

        let err = store
            .create_user(new_user("other", "chef@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_of_missing_user_is_none_before_constraints() {
        let store = MemoryStore::new();
        store.create_user(new_user("chef", "chef@example.com")).await.unwrap();

        let changes = UpdateUserRequest {
            email: Some("chef@example.com".to_string()),
            ..Default::default()
        };
        let updated = store
            .update_user(&Uuid::new_v4().to_string(), changes)
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_malformed_id_is_reference_failure() {
        let store = MemoryStore::new();
        let err = store.get_recipe("not-a-uuid").await.unwrap_err();
        assert!(matches!(err, StoreError::Reference(_)));
    }

    #[tokio::test]
    async fn test_unknown_well_formed_id_is_none() {
        let store = MemoryStore::new();
        let missing = Uuid::new_v4().to_string();
        assert!(store.get_recipe(&missing).await.unwrap().is_none());
        assert!(!store.delete_recipe(&missing).await.unwrap());
    }

    #[tokio::test]
    async fn test_dangling_author_is_reference_failure() {
        let store = MemoryStore::new();
        let err = store
            .create_recipe(soup(Some(Uuid::new_v4().to_string())))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Reference(_)));
    }

    #[tokio::test]
    async fn test_list_recipes_filters() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("chef", "chef@example.com")).await.unwrap();
        store.create_recipe(soup(Some(user.id.to_string()))).await.unwrap();
        let mut stew = soup(None);
        stew.title = "Beef Stew".to_string();
        stew.tags = None;
        store.create_recipe(stew).await.unwrap();

        let all = store.list_recipes(RecipeFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Beef Stew");

        let by_author = store
            .list_recipes(RecipeFilter {
                author: Some(user.id.to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_author.len(), 1);

        let by_tag = store
            .list_recipes(RecipeFilter {
                tag: Some("winter".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_tag[0].title, "Soup");

        let by_query = store
            .list_recipes(RecipeFilter {
                q: Some("stew".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_query.len(), 1);
    }

    #[tokio::test]
    async fn test_one_review_per_user_and_recipe() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("chef", "chef@example.com")).await.unwrap();
        let recipe = store.create_recipe(soup(None)).await.unwrap();

        let review = CreateReviewRequest {
            recipe: recipe.id.to_string(),
            user: user.id.to_string(),
            rating: 4,
            comment: None,
        };
        store.create_review(review.clone()).await.unwrap();
        let err = store.create_review(review).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_deleting_recipe_cascades() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("chef", "chef@example.com")).await.unwrap();
        let recipe = store.create_recipe(soup(None)).await.unwrap();
        store
            .create_review(CreateReviewRequest {
                recipe: recipe.id.to_string(),
                user: user.id.to_string(),
                rating: 5,
                comment: Some("great".to_string()),
            })
            .await
            .unwrap();
        let collection = store
            .create_collection(CreateCollectionRequest {
                name: "Favourites".to_string(),
                description: None,
                owner: user.id.to_string(),
                recipes: Some(vec![recipe.id.to_string()]),
            })
            .await
            .unwrap();

        assert!(store.delete_recipe(&recipe.id.to_string()).await.unwrap());

        let reviews = store
            .list_reviews_for_recipe(&recipe.id.to_string())
            .await
            .unwrap();
        assert!(reviews.is_empty());
        let collection = store
            .get_collection(&collection.id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert!(collection.recipes.is_empty());
    }

    #[tokio::test]
    async fn test_add_recipe_to_collection_is_idempotent() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("chef", "chef@example.com")).await.unwrap();
        let recipe = store.create_recipe(soup(None)).await.unwrap();
        let collection = store
            .create_collection(CreateCollectionRequest {
                name: "Weeknight".to_string(),
                description: None,
                owner: user.id.to_string(),
                recipes: None,
            })
            .await
            .unwrap();

        let id = collection.id.to_string();
        let recipe_id = recipe.id.to_string();
        store.add_recipe_to_collection(&id, &recipe_id).await.unwrap();
        let updated = store
            .add_recipe_to_collection(&id, &recipe_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.recipes, vec![recipe.id]);

        let err = store
            .add_recipe_to_collection(&id, &Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Reference(_)));

        let emptied = store
            .remove_recipe_from_collection(&id, &recipe_id)
            .await
            .unwrap()
            .unwrap();
        assert!(emptied.recipes.is_empty());
    }
}
