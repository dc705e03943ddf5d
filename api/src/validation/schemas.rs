//! Rule sets for every mutating endpoint
//!
//! Each request type is bound to its rule set through `Validatable`, so the
//! `ValidatedJson<T>` extractor picks the right one from the handler
//! signature alone. Update endpoints reject undeclared fields: their rule
//! fields are the complete list of what may change.

use once_cell::sync::Lazy;
use shared::models::{
    AddCollectionRecipeRequest, CreateCollectionRequest, CreateRecipeRequest,
    CreateReviewRequest, CreateUserRequest, UpdateCollectionRequest, UpdateRecipeRequest,
    UpdateReviewRequest, UpdateUserRequest,
};

use super::extractors::Validatable;
use super::rules::{FieldKind, FieldRule, RuleSet};

// ─────────────────────────────────────────────────────────────────────────────
// Constants for validation rules
// ─────────────────────────────────────────────────────────────────────────────

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 30;
const MAX_EMAIL_LENGTH: usize = 254;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_BIO_LENGTH: usize = 500;

const MAX_TITLE_LENGTH: usize = 100;
const MAX_RECIPE_DESCRIPTION_LENGTH: usize = 2000;
const MAX_RECIPE_ITEMS: usize = 100;
const MAX_INGREDIENT_LENGTH: usize = 200;
const MAX_INSTRUCTION_LENGTH: usize = 2000;
const MAX_COOKING_MINUTES: i64 = 24 * 60;
const MAX_SERVINGS: i64 = 100;
const MAX_TAGS_COUNT: usize = 20;
const MAX_TAG_LENGTH: usize = 50;

const MIN_RATING: i64 = 1;
const MAX_RATING: i64 = 5;
const MAX_COMMENT_LENGTH: usize = 1000;

const MAX_COLLECTION_NAME_LENGTH: usize = 100;
const MAX_COLLECTION_DESCRIPTION_LENGTH: usize = 500;
const MAX_COLLECTION_RECIPES: usize = 500;

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

pub static CREATE_USER: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new("create_user")
        .field(
            FieldRule::required("username", FieldKind::Text)
                .min_length(MIN_USERNAME_LENGTH)
                .max_length(MAX_USERNAME_LENGTH),
        )
        .field(
            FieldRule::required("email", FieldKind::Text)
                .max_length(MAX_EMAIL_LENGTH)
                .email(),
        )
        .field(
            FieldRule::required("password", FieldKind::Text)
                .min_length(MIN_PASSWORD_LENGTH)
                .max_length(MAX_PASSWORD_LENGTH),
        )
        .field(FieldRule::optional("bio", FieldKind::Text).max_length(MAX_BIO_LENGTH))
});

pub static UPDATE_USER: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new("update_user")
        .field(
            FieldRule::optional("username", FieldKind::Text)
                .min_length(MIN_USERNAME_LENGTH)
                .max_length(MAX_USERNAME_LENGTH),
        )
        .field(
            FieldRule::optional("email", FieldKind::Text)
                .max_length(MAX_EMAIL_LENGTH)
                .email(),
        )
        .field(FieldRule::optional("bio", FieldKind::Text).max_length(MAX_BIO_LENGTH))
        .reject_unknown()
});

// ─────────────────────────────────────────────────────────────────────────────
// Recipes
// ─────────────────────────────────────────────────────────────────────────────

pub static CREATE_RECIPE: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new("create_recipe")
        .field(FieldRule::required("title", FieldKind::Text).max_length(MAX_TITLE_LENGTH))
        .field(
            FieldRule::required("description", FieldKind::Text)
                .max_length(MAX_RECIPE_DESCRIPTION_LENGTH),
        )
        .field(
            FieldRule::required("ingredients", FieldKind::TextList)
                .non_empty()
                .max_items(MAX_RECIPE_ITEMS)
                .item_max_length(MAX_INGREDIENT_LENGTH),
        )
        .field(
            FieldRule::required("instructions", FieldKind::TextList)
                .non_empty()
                .max_items(MAX_RECIPE_ITEMS)
                .item_max_length(MAX_INSTRUCTION_LENGTH),
        )
        .field(FieldRule::optional("cooking_time", FieldKind::Integer).range(1, MAX_COOKING_MINUTES))
        .field(FieldRule::optional("servings", FieldKind::Integer).range(1, MAX_SERVINGS))
        .field(
            FieldRule::optional("tags", FieldKind::TextList)
                .max_items(MAX_TAGS_COUNT)
                .item_max_length(MAX_TAG_LENGTH),
        )
        .field(FieldRule::optional("author", FieldKind::Identifier))
});

pub static UPDATE_RECIPE: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new("update_recipe")
        .field(
            FieldRule::optional("title", FieldKind::Text)
                .non_empty()
                .max_length(MAX_TITLE_LENGTH),
        )
        .field(
            FieldRule::optional("description", FieldKind::Text)
                .non_empty()
                .max_length(MAX_RECIPE_DESCRIPTION_LENGTH),
        )
        .field(
            FieldRule::optional("ingredients", FieldKind::TextList)
                .non_empty()
                .max_items(MAX_RECIPE_ITEMS)
                .item_max_length(MAX_INGREDIENT_LENGTH),
        )
        .field(
            FieldRule::optional("instructions", FieldKind::TextList)
                .non_empty()
                .max_items(MAX_RECIPE_ITEMS)
                .item_max_length(MAX_INSTRUCTION_LENGTH),
        )
        .field(FieldRule::optional("cooking_time", FieldKind::Integer).range(1, MAX_COOKING_MINUTES))
        .field(FieldRule::optional("servings", FieldKind::Integer).range(1, MAX_SERVINGS))
        .field(
            FieldRule::optional("tags", FieldKind::TextList)
                .max_items(MAX_TAGS_COUNT)
                .item_max_length(MAX_TAG_LENGTH),
        )
        .reject_unknown()
});

// ─────────────────────────────────────────────────────────────────────────────
// Reviews
// ─────────────────────────────────────────────────────────────────────────────

pub static CREATE_REVIEW: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new("create_review")
        .field(FieldRule::required("recipe", FieldKind::Identifier))
        .field(FieldRule::required("user", FieldKind::Identifier))
        .field(FieldRule::required("rating", FieldKind::Integer).range(MIN_RATING, MAX_RATING))
        .field(FieldRule::optional("comment", FieldKind::Text).max_length(MAX_COMMENT_LENGTH))
});

pub static UPDATE_REVIEW: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new("update_review")
        .field(FieldRule::optional("rating", FieldKind::Integer).range(MIN_RATING, MAX_RATING))
        .field(FieldRule::optional("comment", FieldKind::Text).max_length(MAX_COMMENT_LENGTH))
        .reject_unknown()
});

// ─────────────────────────────────────────────────────────────────────────────
// Collections
// ─────────────────────────────────────────────────────────────────────────────

pub static CREATE_COLLECTION: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new("create_collection")
        .field(
            FieldRule::required("name", FieldKind::Text).max_length(MAX_COLLECTION_NAME_LENGTH),
        )
        .field(
            FieldRule::optional("description", FieldKind::Text)
                .max_length(MAX_COLLECTION_DESCRIPTION_LENGTH),
        )
        .field(FieldRule::required("owner", FieldKind::Identifier))
        .field(
            FieldRule::optional("recipes", FieldKind::IdentifierList)
                .max_items(MAX_COLLECTION_RECIPES),
        )
});

pub static UPDATE_COLLECTION: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new("update_collection")
        .field(
            FieldRule::optional("name", FieldKind::Text)
                .non_empty()
                .max_length(MAX_COLLECTION_NAME_LENGTH),
        )
        .field(
            FieldRule::optional("description", FieldKind::Text)
                .max_length(MAX_COLLECTION_DESCRIPTION_LENGTH),
        )
        .reject_unknown()
});

pub static ADD_COLLECTION_RECIPE: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new("add_collection_recipe")
        .field(FieldRule::required("recipe", FieldKind::Identifier))
        .reject_unknown()
});

// ─────────────────────────────────────────────────────────────────────────────
// Request type bindings
// ─────────────────────────────────────────────────────────────────────────────

impl Validatable for CreateUserRequest {
    fn rule_set() -> &'static RuleSet {
        &CREATE_USER
    }
}

impl Validatable for UpdateUserRequest {
    fn rule_set() -> &'static RuleSet {
        &UPDATE_USER
    }
}

impl Validatable for CreateRecipeRequest {
    fn rule_set() -> &'static RuleSet {
        &CREATE_RECIPE
    }
}

impl Validatable for UpdateRecipeRequest {
    fn rule_set() -> &'static RuleSet {
        &UPDATE_RECIPE
    }
}

impl Validatable for CreateReviewRequest {
    fn rule_set() -> &'static RuleSet {
        &CREATE_REVIEW
    }
}

impl Validatable for UpdateReviewRequest {
    fn rule_set() -> &'static RuleSet {
        &UPDATE_REVIEW
    }
}

impl Validatable for CreateCollectionRequest {
    fn rule_set() -> &'static RuleSet {
        &CREATE_COLLECTION
    }
}

impl Validatable for UpdateCollectionRequest {
    fn rule_set() -> &'static RuleSet {
        &UPDATE_COLLECTION
    }
}

impl Validatable for AddCollectionRecipeRequest {
    fn rule_set() -> &'static RuleSet {
        &ADD_COLLECTION_RECIPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn fields(rules: &RuleSet, payload: Value) -> Vec<String> {
        rules
            .evaluate(&object(payload))
            .into_iter()
            .map(|v| v.field)
            .collect()
    }

    #[test]
    fn test_recipe_with_empty_title_and_ingredients() {
        let violations = CREATE_RECIPE.evaluate(&object(json!({
            "title": "",
            "description": "valid",
            "ingredients": [],
            "instructions": ["step1"]
        })));

        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].field, "title");
        assert_eq!(violations[0].message, "title is required");
        assert_eq!(violations[1].field, "ingredients");
        assert_eq!(violations[1].message, "must contain at least one item");
    }

    #[test]
    fn test_minimal_recipe_passes() {
        let payload = json!({
            "title": "Soup",
            "description": "Tasty",
            "ingredients": ["salt"],
            "instructions": ["boil"]
        });
        assert!(fields(&CREATE_RECIPE, payload).is_empty());
    }

    #[test]
    fn test_recipe_missing_every_required_field() {
        assert_eq!(
            fields(&CREATE_RECIPE, json!({})),
            vec!["title", "description", "ingredients", "instructions"]
        );
    }

    #[test]
    fn test_recipe_numeric_bounds() {
        let payload = json!({
            "title": "Soup",
            "description": "Tasty",
            "ingredients": ["salt"],
            "instructions": ["boil"],
            "cooking_time": 0,
            "servings": 101
        });
        assert_eq!(fields(&CREATE_RECIPE, payload), vec!["cooking_time", "servings"]);
    }

    #[test]
    fn test_user_rules() {
        let payload = json!({
            "username": "ab",
            "email": "nope",
            "password": "short"
        });
        assert_eq!(fields(&CREATE_USER, payload), vec!["username", "email", "password"]);

        let payload = json!({
            "username": "chef",
            "email": "chef@example.com",
            "password": "correct horse"
        });
        assert!(fields(&CREATE_USER, payload).is_empty());
    }

    #[test]
    fn test_update_user_cannot_touch_password() {
        assert_eq!(
            fields(&UPDATE_USER, json!({ "bio": "hi", "password": "new-secret" })),
            vec!["password"]
        );
    }

    #[test]
    fn test_update_recipe_rejects_blank_title_and_author() {
        assert_eq!(
            fields(&UPDATE_RECIPE, json!({ "title": " ", "author": "someone" })),
            vec!["title", "author"]
        );
        assert!(fields(&UPDATE_RECIPE, json!({ "servings": 4 })).is_empty());
    }

    #[test]
    fn test_review_rating_bounds() {
        let base = |rating: Value| json!({ "recipe": "r", "user": "u", "rating": rating });
        assert!(fields(&CREATE_REVIEW, base(json!(5))).is_empty());
        assert_eq!(fields(&CREATE_REVIEW, base(json!(6))), vec!["rating"]);
        assert_eq!(fields(&CREATE_REVIEW, base(json!("5"))), vec!["rating"]);
    }

    #[test]
    fn test_collection_rules() {
        assert_eq!(
            fields(&CREATE_COLLECTION, json!({ "recipes": [1] })),
            vec!["name", "owner", "recipes"]
        );
        assert_eq!(
            fields(&ADD_COLLECTION_RECIPE, json!({ "recipe": "r", "extra": 1 })),
            vec!["extra"]
        );
    }

    #[test]
    fn test_request_types_are_bound_to_their_rule_sets() {
        assert_eq!(CreateRecipeRequest::rule_set().name(), "create_recipe");
        assert_eq!(UpdateUserRequest::rule_set().name(), "update_user");
        assert_eq!(AddCollectionRecipeRequest::rule_set().name(), "add_collection_recipe");
    }
}
