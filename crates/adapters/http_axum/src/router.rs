//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use pinhub_app::ports::{Clock, HouseRepository, OutputPort, SwitchRecorder};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests the API routes under `/api` and adds a [`TraceLayer`] that logs
/// each HTTP request/response using the `tracing` ecosystem.
pub fn build<S, P, C>(state: AppState<S, P, C>) -> Router
where
    S: HouseRepository + SwitchRecorder + Send + Sync + 'static,
    P: OutputPort,
    C: Clock,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
