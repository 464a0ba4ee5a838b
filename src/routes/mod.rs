// Route definitions

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

mod api;

pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/filters/:vehicle_type", get(api::get_filters))
        .route("/search", get(api::search_vehicles))
        .route("/vehicles/:id", get(api::get_vehicle))
        .route("/quote", post(api::quote_trip))
        .route("/checkout", post(api::checkout))
        .with_state(app_state);

    Router::new()
        .route("/health", get(api::health))
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
}
