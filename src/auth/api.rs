//! Authentication API Endpoints
//! Mission: Login and user management over REST

use crate::auth::{
    jwt::JwtHandler,
    middleware::auth_middleware,
    models::{
        CreateUserRequest, Identity, LoginRequest, LoginResponse, RestResult, Role,
        UpdateUserRequest, UserResponse,
    },
    service::{authorize, AuthError, AuthService},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Shared auth state, constructed once at startup
#[derive(Clone)]
pub struct AuthState {
    pub service: Arc<AuthService>,
    pub jwt: Arc<JwtHandler>,
}

impl AuthState {
    pub fn new(service: Arc<AuthService>, jwt: Arc<JwtHandler>) -> Self {
        Self { service, jwt }
    }
}

/// Build the full REST surface: a public login route plus the
/// admin-gated user management routes behind the auth middleware.
pub fn router(state: AuthState) -> Router {
    let public = Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/login", post(login))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/:id", put(update_user).delete(delete_user))
        .route_layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new().merge(public).merge(protected)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Login - POST /api/auth/login
async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    let Json(payload) = payload.map_err(|_| AuthError::Validation("invalid body".to_string()))?;

    let (user, token) = state
        .service
        .authenticate(&payload.username, &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        username: user.username,
        token,
        zones: user.zones,
        role: user.role,
    }))
}

/// List users - GET /api/users (Admin only)
async fn list_users(
    State(state): State<AuthState>,
    identity: Option<Extension<Identity>>,
) -> Result<Json<RestResult<UserResponse>>, AuthError> {
    let Extension(identity) = identity.ok_or(AuthError::NotPermitted)?;
    authorize(&identity, Role::Admin)?;

    let users = state.service.list_users()?;
    let results: Vec<UserResponse> = users.iter().map(UserResponse::from_user).collect();
    let total_results = results.len();

    Ok(Json(RestResult {
        results,
        total_results,
    }))
}

/// Create user - POST /api/users (Admin only)
async fn create_user(
    State(state): State<AuthState>,
    identity: Option<Extension<Identity>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AuthError> {
    let Extension(identity) = identity.ok_or(AuthError::NotPermitted)?;
    authorize(&identity, Role::Admin)?;

    // An unrecognized role fails typed deserialization, so it lands here
    // as an invalid body
    let Json(payload) =
        payload.map_err(|_| AuthError::Validation("invalid request body".to_string()))?;

    let user = state
        .service
        .create_user(&payload.username, &payload.password, payload.role, payload.zones)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}

/// Replace a user's zones - PUT /api/users/:id (Admin only)
async fn update_user(
    State(state): State<AuthState>,
    identity: Option<Extension<Identity>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AuthError> {
    let Extension(identity) = identity.ok_or(AuthError::NotPermitted)?;
    authorize(&identity, Role::Admin)?;

    let Json(payload) =
        payload.map_err(|_| AuthError::Validation("invalid request body".to_string()))?;
    let id = Uuid::parse_str(&id).map_err(|_| AuthError::NotFound)?;

    let user = state.service.update_user_zones(&id, payload.zones)?;

    Ok(Json(UserResponse::from_user(&user)))
}

/// Delete user - DELETE /api/users/:id (Admin only)
async fn delete_user(
    State(state): State<AuthState>,
    identity: Option<Extension<Identity>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AuthError> {
    let Extension(identity) = identity.ok_or(AuthError::NotPermitted)?;
    authorize(&identity, Role::Admin)?;

    let id = Uuid::parse_str(&id).map_err(|_| AuthError::NotFound)?;

    // Store failures on delete surface as 400, same as the unknown-id case
    state.service.delete_user(&id).map_err(|e| match e {
        AuthError::NotFound => e,
        _ => AuthError::Validation("unable to delete user".to_string()),
    })?;

    Ok(StatusCode::OK)
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AuthError::NotPermitted => (
                StatusCode::UNAUTHORIZED,
                "not permitted to access this resource".to_string(),
            ),
            AuthError::Conflict => (StatusCode::CONFLICT, "username in use".to_string()),
            AuthError::NotFound => (StatusCode::BAD_REQUEST, "user does not exist".to_string()),
            AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
