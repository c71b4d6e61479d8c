use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::config::Settings;
use crate::services::CatService;

/// Shared application state available to all handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub cats: CatService,
    pub identity: Arc<dyn IdentityProvider>,
}
