pub mod error;
pub mod routes;
pub mod types;

use std::sync::Arc;

use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Build the API router.
pub fn router(state: Arc<AppState>, metrics_handle: Option<PrometheusHandle>) -> Router {
    let mut app = Router::new()
        .route("/", axum::routing::get(routes::root))
        .route("/health", axum::routing::get(routes::health))
        .route(
            "/transactions",
            axum::routing::post(routes::submit_transaction),
        )
        .route(
            "/ledgers/{sequence}",
            axum::routing::get(routes::ledger_by_sequence),
        );

    if let Some(handle) = metrics_handle {
        let ledger_state = Arc::clone(&state.ledger_state);
        app = app.route(
            "/metrics",
            axum::routing::get(move || {
                ledger_state.record_metrics();
                std::future::ready(handle.render())
            }),
        );
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
