use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, QueueState};

pub fn queue_routes(state: Arc<QueueState>) -> Router {
    let protected_routes = Router::new()
        .route("/appointments/{appointment_id}/enter", post(handlers::enter_queue))
        .route("/appointments/{appointment_id}/begin", post(handlers::begin_consultation))
        .route("/appointments/{appointment_id}/complete", post(handlers::complete_appointment))
        .route("/appointments/{appointment_id}/position", get(handlers::get_position))
        .route("/doctors/{doctor_id}/{date}", get(handlers::get_queue))
        .route("/doctors/{doctor_id}/{date}/call-next", post(handlers::call_next))
        .route("/doctors/{doctor_id}/{date}/feed", get(handlers::day_feed))
        .route("/stats", get(handlers::get_queue_stats))
        .route("/feed", get(handlers::global_feed))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
