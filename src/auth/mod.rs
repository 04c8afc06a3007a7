//! Authentication Module
//! Mission: Credential verification, bearer tokens, RBAC, and user lifecycle

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod store;

pub use api::AuthState;
pub use jwt::JwtHandler;
pub use middleware::auth_middleware;
pub use service::{authorize, AuthError, AuthService};
pub use store::{SqliteUserStore, StoreError, UserStore};
