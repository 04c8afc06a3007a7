//! User Storage
//! Mission: Durable user records behind an engine-independent interface

use crate::auth::models::{Role, User};
use rusqlite::{params, Connection, ErrorCode};
use tracing::info;
use uuid::Uuid;

/// Domain-level storage failures. The core only ever matches on these;
/// engine-specific error values never leave this module.
#[derive(Debug)]
pub enum StoreError {
    NotFound,
    Duplicate,
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "record not found"),
            StoreError::Duplicate => write!(f, "unique constraint violated"),
            StoreError::Backend(msg) => write!(f, "storage backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == ErrorCode::ConstraintViolation =>
            {
                StoreError::Duplicate
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// Persistence collaborator consumed by the lifecycle manager.
pub trait UserStore: Send + Sync {
    fn get_user_by_username(&self, username: &str) -> Result<User, StoreError>;
    fn get_user_by_id(&self, id: &Uuid) -> Result<User, StoreError>;
    fn get_users(&self) -> Result<Vec<User>, StoreError>;
    fn create_user(&self, user: &User) -> Result<(), StoreError>;
    fn save_user(&self, user: &User) -> Result<(), StoreError>;
    fn delete_user(&self, id: &Uuid) -> Result<(), StoreError>;
}

/// SQLite-backed user store
pub struct SqliteUserStore {
    db_path: String,
}

const USER_COLUMNS: &str = "id, username, password_hash, role, zones, created_at";

impl SqliteUserStore {
    pub fn new(db_path: &str) -> Result<Self, StoreError> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<(), StoreError> {
        let conn = self.connect()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                zones TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        info!("💾 User store ready at: {}", self.db_path);
        Ok(())
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.db_path)?;
        // Concurrent writers queue on the file lock instead of failing fast
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(conn)
    }

    fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
        let id_str: String = row.get(0)?;
        let role_str: String = row.get(3)?;
        let zones_json: String = row.get(4)?;

        let id = Uuid::parse_str(&id_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let role = Role::from_str(&role_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("unrecognized role: {}", role_str).into(),
            )
        })?;
        let zones: Vec<String> = serde_json::from_str(&zones_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(User {
            id,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            role,
            zones,
            created_at: row.get(5)?,
        })
    }

    fn zones_json(user: &User) -> Result<String, StoreError> {
        serde_json::to_string(&user.zones).map_err(|e| StoreError::Backend(e.to_string()))
    }
}

impl UserStore for SqliteUserStore {
    fn get_user_by_username(&self, username: &str) -> Result<User, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE username = ?1",
            USER_COLUMNS
        ))?;
        Ok(stmt.query_row(params![username], Self::row_to_user)?)
    }

    fn get_user_by_id(&self, id: &Uuid) -> Result<User, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))?;
        Ok(stmt.query_row(params![id.to_string()], Self::row_to_user)?)
    }

    fn get_users(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM users", USER_COLUMNS))?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let conn = self.connect()?;
        // The UNIQUE constraint on username makes concurrent creates race
        // safely: exactly one insert wins, the rest surface Duplicate.
        conn.execute(
            "INSERT INTO users (id, username, password_hash, role, zones, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id.to_string(),
                user.username,
                user.password_hash,
                user.role.as_str(),
                Self::zones_json(user)?,
                user.created_at,
            ],
        )?;
        Ok(())
    }

    fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let rows = conn.execute(
            "UPDATE users SET username = ?2, password_hash = ?3, role = ?4,
             zones = ?5, created_at = ?6 WHERE id = ?1",
            params![
                user.id.to_string(),
                user.username,
                user.password_hash,
                user.role.as_str(),
                Self::zones_json(user)?,
                user.created_at,
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn delete_user(&self, id: &Uuid) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;

        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
