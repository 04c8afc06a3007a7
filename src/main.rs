//! ZoneLink - Identity & Access Control for the device-management platform
//! Mission: Authenticate operators and gate administrative operations

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::{env, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zonelink_backend::auth::{AuthService, AuthState, JwtHandler, SqliteUserStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    info!("🚀 ZoneLink identity service starting");

    let db_path = env::var("AUTH_DB_PATH").unwrap_or_else(|_| "zonelink_auth.db".to_string());
    let jwt_secret = env::var("JWT_SECRET")
        .unwrap_or_else(|_| "dev-secret-change-in-production-minimum-32-characters".to_string());
    let expiration_hours = env::var("JWT_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(8);

    let store = Arc::new(SqliteUserStore::new(&db_path).context("Failed to open user store")?);
    let jwt = Arc::new(JwtHandler::with_expiration(jwt_secret, expiration_hours));
    let service = Arc::new(AuthService::new(store, jwt.clone()));

    info!("🔐 Authentication initialized at: {}", db_path);

    // Make a fresh deployment reachable
    let bootstrap_password =
        env::var("BOOTSTRAP_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
    if service
        .ensure_default_admin(&bootstrap_password)
        .await
        .context("Failed to bootstrap admin account")?
    {
        warn!("⚠️  CHANGE THE DEFAULT ADMIN PASSWORD IN PRODUCTION!");
    }

    let app = zonelink_backend::auth::api::router(AuthState::new(service, jwt))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr).await?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Initialize tracing with env-filter controlled verbosity
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zonelink_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
