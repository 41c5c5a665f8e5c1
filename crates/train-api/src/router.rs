use axum::{
    Router,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::messages;
use crate::state::AppState;

/// All message routes. Mounted at `/messages` and again at `/api/messages`,
/// the path browser clients use.
pub fn build_router(state: AppState) -> Router {
    let message_routes = get(messages::list_messages)
        .post(messages::create_message)
        .patch(messages::react_to_message);

    Router::new()
        .route("/messages", message_routes.clone())
        .route("/api/messages", message_routes)
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
