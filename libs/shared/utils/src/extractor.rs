use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;

use crate::jwt::validate_token;

pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = validate_token(token, &config.supabase_jwt_secret)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// The caller's id as a UUID; every clinic principal is keyed by one.
pub fn user_uuid(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::BadRequest("Invalid user ID format".to_string()))
}

pub fn require_role(user: &User, allowed: &[Role]) -> Result<Role, AppError> {
    let role = user.role();
    if allowed.contains(&role) {
        Ok(role)
    } else {
        Err(AppError::Forbidden(format!("Role {} may not perform this action", role)))
    }
}

/// Admins act on anyone's behalf; everyone else only on their own.
pub fn require_self_or_admin(user: &User, owner_id: Uuid) -> Result<(), AppError> {
    if user.is_admin() || user_uuid(user)? == owner_id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Access denied".to_string()))
    }
}
