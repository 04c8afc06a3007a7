//! Authentication Models
//! Mission: Define user, claims, and request/response data structures

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operator account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub role: Role,
    pub zones: Vec<String>,
    pub created_at: String,
}

/// Operator roles for RBAC
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin, // Full access to user management
    #[serde(rename = "zone_admin")]
    ZoneAdmin, // Scoped to assigned zones
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::ZoneAdmin => "zone_admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "zone_admin" => Some(Role::ZoneAdmin),
            _ => None,
        }
    }
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject (user id)
    pub username: String,
    pub role: Role,
    pub iat: usize, // issued-at timestamp
    pub exp: usize, // expiration timestamp
}

/// Validated request identity, produced once per request by token
/// validation and threaded explicitly to every gated operation.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            username: claims.username.clone(),
            role: claims.role,
        }
    }

    /// Exact role match. There is no role hierarchy: Admin does not
    /// implicitly satisfy a ZoneAdmin requirement.
    pub fn has_role(&self, required: Role) -> bool {
        self.role == required
    }
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub token: String,
    pub zones: Vec<String>,
    pub role: Role,
}

/// User creation request
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub zones: Option<Vec<String>>,
}

/// Zone replacement request - the only mutable field in this scope
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub zones: Vec<String>,
}

/// User projection (password hash redacted)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub zones: Vec<String>,
    pub created_at: String,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            zones: user.zones.clone(),
            created_at: user.created_at.clone(),
        }
    }
}

/// Collection envelope for list endpoints
#[derive(Debug, Serialize)]
pub struct RestResult<T> {
    pub results: Vec<T>,
    #[serde(rename = "totalResults")]
    pub total_results: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let admin = Role::Admin;
        let json = serde_json::to_string(&admin).unwrap();
        assert_eq!(json, r#""admin""#);

        let zone_admin: Role = serde_json::from_str(r#""zone_admin""#).unwrap();
        assert_eq!(zone_admin, Role::ZoneAdmin);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result: Result<Role, _> = serde_json::from_str(r#""superuser""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_role_string_conversion() {
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::ZoneAdmin.as_str(), "zone_admin");

        assert_eq!(Role::from_str("admin"), Some(Role::Admin));
        assert_eq!(Role::from_str("ZONE_ADMIN"), Some(Role::ZoneAdmin));
        assert_eq!(Role::from_str("invalid"), None);
    }

    #[test]
    fn test_has_role_exact_match() {
        let identity = Identity {
            user_id: Uuid::new_v4().to_string(),
            username: "alice".to_string(),
            role: Role::Admin,
        };

        assert!(identity.has_role(Role::Admin));
        assert!(!identity.has_role(Role::ZoneAdmin));

        let scoped = Identity {
            user_id: Uuid::new_v4().to_string(),
            username: "bob".to_string(),
            role: Role::ZoneAdmin,
        };

        assert!(scoped.has_role(Role::ZoneAdmin));
        assert!(!scoped.has_role(Role::Admin));
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            password_hash: "secret-hash".to_string(),
            role: Role::Admin,
            zones: vec!["z1".to_string()],
            created_at: "2025-01-01T00:00:00Z".to_string(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }

    #[test]
    fn test_create_request_zones_optional() {
        let body = r#"{"username":"bob","password":"pw","role":"zone_admin"}"#;
        let req: CreateUserRequest = serde_json::from_str(body).unwrap();
        assert!(req.zones.is_none());
    }
}
