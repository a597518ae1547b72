// Points Gateway - HTTP boundary for the points ledger
// Maps requests onto ledger operations and serializes their results

pub mod error;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use points_ledger::Ledger;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub service_name: String,
}

impl AppState {
    pub fn new(ledger: Ledger, service_name: impl Into<String>) -> Self {
        Self {
            ledger,
            service_name: service_name.into(),
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/add", post(handlers::add_points))
        .route("/spend", post(handlers::spend_points))
        .route("/balance", get(handlers::get_balance))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
