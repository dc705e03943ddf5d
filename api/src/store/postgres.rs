use async_trait::async_trait;
use shared::{
    Collection, CreateCollectionRequest, CreateRecipeRequest, CreateReviewRequest, NewUser,
    Recipe, RecipeFilter, Review, StoreError, StoreResult, UpdateCollectionRequest,
    UpdateRecipeRequest, UpdateReviewRequest, UpdateUserRequest, User,
};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use uuid::Uuid;

use super::{parse_id, parse_ids, RecipeStore};

// SQLSTATE codes the classifier cares about
const NOT_NULL_VIOLATION: &str = "23502";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

/// Tag a driver error with the storage failure kind.
fn map_db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = err {
        let message = db.message().to_string();
        match db.code().as_deref() {
            Some(NOT_NULL_VIOLATION) | Some(UNIQUE_VIOLATION) | Some(CHECK_VIOLATION) => {
                return StoreError::Validation(message)
            }
            Some(FOREIGN_KEY_VIOLATION) | Some(INVALID_TEXT_REPRESENTATION) => {
                return StoreError::Reference(message)
            }
            _ => {}
        }
    }
    StoreError::Other(err.to_string())
}

/// `ILIKE` pattern matching `q` anywhere, with `q` taken literally.
fn contains_pattern(q: &str) -> String {
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for c in q.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Fail with `Reference` unless every id names a recipe. The rows stay
/// share-locked until `conn`'s transaction ends, so a concurrent delete
/// cannot slip in before the ids are stored.
async fn require_recipes(conn: &mut PgConnection, ids: &[Uuid]) -> StoreResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let found: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM recipes WHERE id = ANY($1) FOR SHARE")
            .bind(ids)
            .fetch_all(conn)
            .await
            .map_err(map_db_error)?;

    match ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(StoreError::reference(format!(
            "Referenced recipe {} does not exist",
            missing
        ))),
        None => Ok(()),
    }
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_db_error)
    }

    // ── Users ───────────────────────────────────────────────────────────────

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, bio)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.bio)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        let id = parse_id("id", id)?;
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update_user(&self, id: &str, changes: UpdateUserRequest) -> StoreResult<Option<User>> {
        let id = parse_id("id", id)?;
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                bio = COALESCE($4, bio),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.username)
        .bind(&changes.email)
        .bind(&changes.bio)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        let id = parse_id("id", id)?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    // ── Recipes ─────────────────────────────────────────────────────────────

    async fn create_recipe(&self, recipe: CreateRecipeRequest) -> StoreResult<Recipe> {
        let author = recipe
            .author
            .as_deref()
            .map(|raw| parse_id("author", raw))
            .transpose()?;

        sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes
                (id, title, description, ingredients, instructions, cooking_time, servings, tags, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(&recipe.ingredients)
        .bind(&recipe.instructions)
        .bind(recipe.cooking_time)
        .bind(recipe.servings)
        .bind(recipe.tags.unwrap_or_default())
        .bind(author)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn list_recipes(&self, filter: RecipeFilter) -> StoreResult<Vec<Recipe>> {
        let author = filter
            .author
            .as_deref()
            .map(|raw| parse_id("author", raw))
            .transpose()?;

        sqlx::query_as::<_, Recipe>(
            r#"
            SELECT * FROM recipes
            WHERE ($1::uuid IS NULL OR author_id = $1)
              AND ($2::text IS NULL OR $2 = ANY(tags))
              AND ($3::text IS NULL OR title ILIKE $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(author)
        .bind(&filter.tag)
        .bind(filter.q.as_deref().map(contains_pattern))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get_recipe(&self, id: &str) -> StoreResult<Option<Recipe>> {
        let id = parse_id("id", id)?;
        sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update_recipe(
        &self,
        id: &str,
        changes: UpdateRecipeRequest,
    ) -> StoreResult<Option<Recipe>> {
        let id = parse_id("id", id)?;
        sqlx::query_as::<_, Recipe>(
            r#"
            UPDATE recipes
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                ingredients = COALESCE($4, ingredients),
                instructions = COALESCE($5, instructions),
                cooking_time = COALESCE($6, cooking_time),
                servings = COALESCE($7, servings),
                tags = COALESCE($8, tags),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.ingredients)
        .bind(&changes.instructions)
        .bind(changes.cooking_time)
        .bind(changes.servings)
        .bind(&changes.tags)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_recipe(&self, id: &str) -> StoreResult<bool> {
        let id = parse_id("id", id)?;
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // The delete waits on any share lock held by a collection write, so
        // the strip below sees that write's ids.
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        sqlx::query("UPDATE collections SET recipe_ids = array_remove(recipe_ids, $1)")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    // ── Reviews ─────────────────────────────────────────────────────────────

    async fn create_review(&self, review: CreateReviewRequest) -> StoreResult<Review> {
        let recipe = parse_id("recipe", &review.recipe)?;
        let user = parse_id("user", &review.user)?;

        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (id, recipe_id, user_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(recipe)
        .bind(user)
        .bind(review.rating)
        .bind(&review.comment)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn list_reviews_for_recipe(&self, recipe_id: &str) -> StoreResult<Vec<Review>> {
        let recipe = parse_id("recipe", recipe_id)?;
        sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE recipe_id = $1 ORDER BY created_at DESC",
        )
        .bind(recipe)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get_review(&self, id: &str) -> StoreResult<Option<Review>> {
        let id = parse_id("id", id)?;
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update_review(
        &self,
        id: &str,
        changes: UpdateReviewRequest,
    ) -> StoreResult<Option<Review>> {
        let id = parse_id("id", id)?;
        sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET rating = COALESCE($2, rating),
                comment = COALESCE($3, comment)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.rating)
        .bind(&changes.comment)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_review(&self, id: &str) -> StoreResult<bool> {
        let id = parse_id("id", id)?;
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    // ── Collections ─────────────────────────────────────────────────────────

    async fn create_collection(
        &self,
        collection: CreateCollectionRequest,
    ) -> StoreResult<Collection> {
        let owner = parse_id("owner", &collection.owner)?;
        let recipes = parse_ids("recipes", &collection.recipes.unwrap_or_default())?;
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        require_recipes(&mut *tx, &recipes).await?;

        let created = sqlx::query_as::<_, Collection>(
            r#"
            INSERT INTO collections (id, name, description, owner_id, recipe_ids)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&collection.name)
        .bind(&collection.description)
        .bind(owner)
        .bind(&recipes)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(created)
    }

    async fn list_collections(&self) -> StoreResult<Vec<Collection>> {
        sqlx::query_as::<_, Collection>("SELECT * FROM collections ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_collection(&self, id: &str) -> StoreResult<Option<Collection>> {
        let id = parse_id("id", id)?;
        sqlx::query_as::<_, Collection>("SELECT * FROM collections WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update_collection(
        &self,
        id: &str,
        changes: UpdateCollectionRequest,
    ) -> StoreResult<Option<Collection>> {
        let id = parse_id("id", id)?;
        sqlx::query_as::<_, Collection>(
            r#"
            UPDATE collections
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_collection(&self, id: &str) -> StoreResult<bool> {
        let id = parse_id("id", id)?;
        let result = sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_recipe_to_collection(
        &self,
        id: &str,
        recipe_id: &str,
    ) -> StoreResult<Option<Collection>> {
        let id = parse_id("id", id)?;
        let recipe = parse_id("recipe", recipe_id)?;

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM collections WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_error)?;
        if exists.is_none() {
            return Ok(None);
        }
        require_recipes(&mut *tx, &[recipe]).await?;

        let updated = sqlx::query_as::<_, Collection>(
            r#"
            UPDATE collections
            SET recipe_ids = CASE
                    WHEN $2 = ANY(recipe_ids) THEN recipe_ids
                    ELSE array_append(recipe_ids, $2)
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(recipe)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(updated)
    }

    async fn remove_recipe_from_collection(
        &self,
        id: &str,
        recipe_id: &str,
    ) -> StoreResult<Option<Collection>> {
        let id = parse_id("id", id)?;
        let recipe = parse_id("recipe", recipe_id)?;

        sqlx::query_as::<_, Collection>(
            r#"
            UPDATE collections
            SET recipe_ids = array_remove(recipe_ids, $2),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(recipe)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    use sqlx::error::{DatabaseError, ErrorKind};

    /// Driver error carrying only a SQLSTATE code.
    #[derive(Debug)]
    struct PgFailure {
        code: &'static str,
    }

    impl fmt::Display for PgFailure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "sqlstate {}", self.code)
        }
    }

    impl StdError for PgFailure {}

    impl DatabaseError for PgFailure {
        fn message(&self) -> &str {
            "constraint failed"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn sqlstate(code: &'static str) -> StoreError {
        map_db_error(sqlx::Error::Database(Box::new(PgFailure { code })))
    }

    #[test]
    fn test_constraint_codes_are_validation() {
        for code in ["23502", "23505", "23514"] {
            assert_eq!(
                sqlstate(code),
                StoreError::Validation("constraint failed".to_string()),
                "sqlstate {}",
                code
            );
        }
    }

    #[test]
    fn test_reference_codes_are_reference() {
        for code in ["22P02", "23503"] {
            assert_eq!(
                sqlstate(code),
                StoreError::Reference("constraint failed".to_string()),
                "sqlstate {}",
                code
            );
        }
    }

    #[test]
    fn test_other_codes_are_other() {
        for code in ["40001", "42P01", "57014"] {
            assert!(matches!(sqlstate(code), StoreError::Other(_)), "sqlstate {}", code);
        }
    }

    /// Runs against a live database when `TEST_DATABASE_URL` is set.
    #[tokio::test]
    async fn test_collection_recipes_never_dangle() {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            return;
        };
        let store = PgStore::connect(&url, 2).await.unwrap();
        store.migrate().await.unwrap();

        let suffix = Uuid::new_v4().simple().to_string();
        let owner = store
            .create_user(NewUser {
                username: format!("u{}", &suffix[..12]),
                email: format!("{}@example.com", suffix),
                password_hash: "hash".to_string(),
                bio: None,
            })
            .await
            .unwrap();
        let recipe = store
            .create_recipe(CreateRecipeRequest {
                title: "Broth".to_string(),
                description: "Clear".to_string(),
                ingredients: vec!["bones".to_string()],
                instructions: vec!["simmer".to_string()],
                cooking_time: None,
                servings: None,
                tags: None,
                author: None,
            })
            .await
            .unwrap();
        let collection = store
            .create_collection(CreateCollectionRequest {
                name: "Stocks".to_string(),
                description: None,
                owner: owner.id.to_string(),
                recipes: Some(vec![recipe.id.to_string()]),
            })
            .await
            .unwrap();
        assert_eq!(collection.recipes, vec![recipe.id]);

        assert!(store.delete_recipe(&recipe.id.to_string()).await.unwrap());
        let collection = store
            .get_collection(&collection.id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert!(collection.recipes.is_empty());

        let err = store
            .add_recipe_to_collection(&collection.id.to_string(), &recipe.id.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Reference(_)));

        store.delete_user(&owner.id.to_string()).await.unwrap();
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("soup"), "%soup%");
        assert_eq!(contains_pattern("100%_rye"), "%100\\%\\_rye%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_non_database_errors_are_other() {
        let err = map_db_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Other(_)));

        let err = map_db_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Other(_)));
    }
}
