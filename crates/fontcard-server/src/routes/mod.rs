// Export route modules
pub mod chat;
pub mod model_info;

#[cfg(test)]
pub mod testing;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(chat::routes(state.clone()))
        .merge(model_info::routes(state))
}
