pub mod middleware;
pub mod routes;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::web::middleware::auth as auth_middleware;
use crate::web::routes::{attendance, check_in, events, health, tokens};

pub fn build_router(state: AppState) -> Router {
    // Everything under /api requires a verified session.
    let protected_routes = Router::new()
        .route(
            "/api/events",
            get(events::list_events_handler).post(events::create_event_handler),
        )
        .route("/api/events/:event_id", get(events::get_event_handler))
        .route(
            "/api/events/:event_id/cancel",
            post(events::cancel_event_handler),
        )
        .route(
            "/api/events/:event_id/participants",
            get(events::list_participants_handler).post(events::register_participant_handler),
        )
        .route(
            "/api/events/:event_id/participants/:participant_id/check-in",
            post(check_in::manual_check_in_handler).delete(check_in::undo_check_in_handler),
        )
        .route(
            "/api/events/:event_id/check-in-tokens",
            get(tokens::list_tokens_handler).post(tokens::issue_token_handler),
        )
        .route(
            "/api/check-in-tokens/:token_id/revoke",
            post(tokens::revoke_token_handler),
        )
        .route("/api/check-ins", post(check_in::check_in_handler))
        .route(
            "/api/events/:event_id/attendance",
            get(attendance::attendance_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::require_auth,
        ));

    Router::new()
        // Public routes
        .route("/health", get(health::health_handler))
        .route("/check-in", get(check_in::check_in_page))
        // Protected routes
        .merge(protected_routes)
        // Layers
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
