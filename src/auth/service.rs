//! User Lifecycle Manager
//! Mission: Account lifecycle and authentication behind one explicit service

use crate::auth::jwt::JwtHandler;
use crate::auth::models::{Identity, Role, User};
use crate::auth::password::{hash_password, validate_password};
use crate::auth::store::{StoreError, UserStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Domain error taxonomy surfaced by every lifecycle operation.
///
/// Authentication and authorization failures are deliberately collapsed
/// into one `NotPermitted` variant so callers cannot distinguish unknown
/// username from wrong password, or missing credential from wrong role.
/// Conflict and not-found reveal no secrets and matter for client
/// correctness, so they stay distinct.
#[derive(Debug)]
pub enum AuthError {
    Validation(String),
    NotPermitted,
    Conflict,
    NotFound,
    Internal,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Validation(msg) => write!(f, "{}", msg),
            AuthError::NotPermitted => write!(f, "not permitted"),
            AuthError::Conflict => write!(f, "already exists"),
            AuthError::NotFound => write!(f, "not found"),
            AuthError::Internal => write!(f, "internal error"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Refuse unless the identity's role exactly matches the requirement.
pub fn authorize(identity: &Identity, required: Role) -> Result<(), AuthError> {
    if identity.has_role(required) {
        return Ok(());
    }
    debug!(
        "Authorization refused: {} has role {}, requires {}",
        identity.username,
        identity.role.as_str(),
        required.as_str()
    );
    Err(AuthError::NotPermitted)
}

/// The lifecycle service, constructed once at startup with its
/// collaborators held explicitly. No ambient global state.
pub struct AuthService {
    store: Arc<dyn UserStore>,
    jwt: Arc<JwtHandler>,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, jwt: Arc<JwtHandler>) -> Self {
        Self { store, jwt }
    }

    /// Create a user account. Zones default to the empty set; the
    /// plaintext password is hashed and dropped, never stored.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
        zones: Option<Vec<String>>,
    ) -> Result<User, AuthError> {
        // bcrypt is deliberately expensive; run it off the reactor so one
        // request's hashing never stalls another's
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|_| AuthError::Internal)?
            .map_err(|e| {
                warn!("Password hashing failed: {}", e);
                AuthError::Internal
            })?;

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
            role,
            zones: zones.unwrap_or_default(),
            created_at: Utc::now().to_rfc3339(),
        };

        match self.store.create_user(&user) {
            Ok(()) => {
                info!("✅ Created user: {} ({})", user.username, user.role.as_str());
                Ok(user)
            }
            Err(StoreError::Duplicate) => Err(AuthError::Conflict),
            Err(e) => {
                warn!("Failed to store user {}: {}", user.username, e);
                Err(AuthError::Internal)
            }
        }
    }

    pub fn list_users(&self) -> Result<Vec<User>, AuthError> {
        self.store.get_users().map_err(|e| {
            warn!("Failed to list users: {}", e);
            AuthError::Internal
        })
    }

    /// Replace a user's zone set wholesale. Nothing else is mutable
    /// through this operation.
    pub fn update_user_zones(&self, id: &Uuid, zones: Vec<String>) -> Result<User, AuthError> {
        let mut user = match self.store.get_user_by_id(id) {
            Ok(user) => user,
            Err(StoreError::NotFound) => return Err(AuthError::NotFound),
            Err(e) => {
                warn!("Failed to load user {}: {}", id, e);
                return Err(AuthError::Internal);
            }
        };

        user.zones = zones;

        match self.store.save_user(&user) {
            Ok(()) => Ok(user),
            Err(StoreError::NotFound) => Err(AuthError::NotFound),
            Err(e) => {
                warn!("Failed to save user {}: {}", id, e);
                Err(AuthError::Internal)
            }
        }
    }

    pub fn delete_user(&self, id: &Uuid) -> Result<(), AuthError> {
        match self.store.delete_user(id) {
            Ok(()) => {
                info!("🗑️  Deleted user: {}", id);
                Ok(())
            }
            Err(StoreError::NotFound) => Err(AuthError::NotFound),
            Err(e) => {
                warn!("Failed to delete user {}: {}", id, e);
                Err(AuthError::Internal)
            }
        }
    }

    /// Verify credentials and mint a bearer token.
    ///
    /// Unknown username and wrong password produce the same failure so
    /// usernames cannot be enumerated through this endpoint.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(User, String), AuthError> {
        let user = match self.store.get_user_by_username(username) {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                debug!("Login attempt for unknown username: {}", username);
                return Err(AuthError::NotPermitted);
            }
            Err(e) => {
                warn!("Failed to load user {}: {}", username, e);
                return Err(AuthError::Internal);
            }
        };

        let stored_hash = user.password_hash.clone();
        let password = password.to_string();
        let valid =
            tokio::task::spawn_blocking(move || validate_password(&stored_hash, &password))
                .await
                .map_err(|_| AuthError::Internal)?;

        if !valid {
            debug!("Failed login attempt: {}", username);
            return Err(AuthError::NotPermitted);
        }

        let token = self.jwt.generate_token(&user).map_err(|e| {
            warn!("Failed to generate token for {}: {}", username, e);
            AuthError::Internal
        })?;

        info!("🔐 Login successful: {} ({})", user.username, user.role.as_str());
        Ok((user, token))
    }

    /// Create a bootstrap admin account if no Admin user exists yet, so a
    /// fresh deployment is reachable. Returns whether one was created.
    pub async fn ensure_default_admin(&self, password: &str) -> Result<bool, AuthError> {
        let has_admin = self
            .list_users()?
            .iter()
            .any(|u| u.role == Role::Admin);

        if has_admin {
            return Ok(false);
        }

        match self.create_user("admin", password, Role::Admin, None).await {
            Ok(_) => {
                warn!("⚠️  Default admin account created - change its password");
                Ok(true)
            }
            // Another instance raced us to it
            Err(AuthError::Conflict) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
