//! Application state shared across handlers

use auth::{AuthState, IdentityResolver};
use axum::extract::FromRef;
use media::{MediaCatalog, UploadPipeline};
use std::sync::Arc;

use crate::repositories::InteractionStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub uploads: UploadPipeline,
    pub catalog: MediaCatalog,
    pub interactions: Arc<dyn InteractionStore>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for IdentityResolver {
    fn from_ref(state: &AppState) -> Self {
        state.auth.identity.clone()
    }
}
