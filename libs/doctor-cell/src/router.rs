use std::sync::Arc;

use axum::{
    middleware,
    routing::put,
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, DoctorState};

pub fn doctor_routes(state: Arc<DoctorState>) -> Router {
    let protected_routes = Router::new()
        .route(
            "/{doctor_id}/schedule",
            put(handlers::upsert_schedule)
                .get(handlers::get_schedule)
                .delete(handlers::remove_schedule),
        )
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
