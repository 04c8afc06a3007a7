//! Authentication Middleware
//! Mission: Turn bearer tokens into validated request identities

use crate::auth::jwt::JwtHandler;
use crate::auth::models::Identity;
use crate::auth::service::AuthError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

/// Middleware guarding administrative routes.
///
/// Validates the `Authorization: Bearer` header and inserts a typed
/// [`Identity`] into request extensions for handlers to thread through
/// the call chain. A missing, malformed, or expired token is refused
/// with the same uniform outcome as an insufficient role.
pub async fn auth_middleware(
    State(jwt): State<Arc<JwtHandler>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or_else(|| {
            debug!("Request without bearer credential refused");
            AuthError::NotPermitted
        })?;

    let claims = jwt.validate_token(token).map_err(|_| AuthError::NotPermitted)?;

    req.extensions_mut().insert(Identity::from_claims(&claims));

    Ok(next.run(req).await)
}
