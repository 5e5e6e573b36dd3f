//! Router assembly. Every request goes through the studio dispatcher.

use crate::handlers::handle;
use crate::state::StudioState;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Router with the dispatcher as fallback, so CORS, prefix and proxy rules see every path and method.
pub fn studio_routes(state: StudioState) -> Router {
    Router::new()
        .fallback(handle)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
