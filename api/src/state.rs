use axum::extract::FromRef;
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

use crate::normalizer::ErrorNormalizer;
use crate::store::RecipeStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecipeStore>,
    pub normalizer: ErrorNormalizer,
    pub started_at: Instant,
    pub registry: Registry,
}

impl AppState {
    pub fn new(store: Arc<dyn RecipeStore>, normalizer: ErrorNormalizer, registry: Registry) -> Self {
        Self {
            store,
            normalizer,
            started_at: Instant::now(),
            registry,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(store: Arc<dyn RecipeStore>) -> Self {
        let registry = Registry::new_custom(Some("test".into()), None).unwrap();
        crate::metrics::register_all(&registry).unwrap();
        Self::new(store, ErrorNormalizer::default(), registry)
    }
}

impl FromRef<AppState> for ErrorNormalizer {
    fn from_ref(state: &AppState) -> Self {
        state.normalizer.clone()
    }
}
