use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/subscribe", post(handlers::subscribe_form))
        .route("/favorite", post(handlers::favorite_form))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/plans/:key", get(handlers::get_plan))
        .route("/api/plans/favorite", post(handlers::favorite))
        .route("/api/analytics", get(handlers::get_analytics))
        .route("/api/analytics/monthly", get(handlers::get_monthly))
        .route("/api/subscribe", post(handlers::subscribe))
        .with_state(state)
}
