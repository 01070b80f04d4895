//! API Routes
//!
//! Configures the Axum router with all guestbook endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use super::admin::{
    bulk_delete_handler, create_guestbook_handler, delete_guestbook_handler,
    delete_message_handler, edit_guestbook_handler, edit_message_handler, reply_handler,
    settings_handler,
};
use super::handlers::{
    health_handler, messages_v1_handler, messages_v2_handler, stats_handler, submit_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: mirrors the request origin; guestbooks with an allow list are
///   checked by the read handlers themselves
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route(
            "/v1/get-guestbook-messages/:guestbook_id",
            get(messages_v1_handler),
        )
        .route(
            "/v2/get-guestbook-messages/:guestbook_id",
            get(messages_v2_handler),
        );

    let admin = Router::new()
        .route("/guestbook/new", post(create_guestbook_handler))
        .route("/guestbook/:guestbook_id/edit", post(edit_guestbook_handler))
        .route("/guestbook/:guestbook_id/delete", post(delete_guestbook_handler))
        .route(
            "/guestbook/:guestbook_id/message/:message_id/edit",
            post(edit_message_handler),
        )
        .route(
            "/guestbook/:guestbook_id/message/:message_id/delete",
            post(delete_message_handler),
        )
        .route(
            "/guestbook/:guestbook_id/message/:message_id/reply",
            post(reply_handler),
        )
        .route(
            "/guestbook/:guestbook_id/messages/bulk-delete",
            post(bulk_delete_handler),
        )
        .route("/settings", post(settings_handler));

    Router::new()
        .nest("/api", api)
        .nest("/admin", admin)
        .route("/guestbook/:guestbook_id/submit", post(submit_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
