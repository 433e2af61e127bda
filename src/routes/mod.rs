pub mod api_routes;
pub mod ws_routes;

use axum::routing::{get, post, put};
use axum::Router;

use crate::service::chat_service::ChatService;

/// Every HTTP and WebSocket route, sharing one [`ChatService`].
pub fn router(chat_service: ChatService) -> Router {
    Router::new()
        .route("/api/sessions", post(api_routes::create_session_handler))
        .route(
            "/api/sessions/{id}",
            get(api_routes::get_session_handler).delete(api_routes::close_session_handler),
        )
        .route("/api/sessions/{id}/context", put(api_routes::switch_context_handler))
        .route("/api/sessions/{id}/messages", post(api_routes::submit_handler))
        .route("/api/summary", post(api_routes::summary_handler))
        .route("/ws/sessions/{id}", get(ws_routes::ws_session_handler))
        .with_state(chat_service)
}
