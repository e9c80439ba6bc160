pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod oauth;
pub mod password;

use api::create_api_router;
use auth::propagate_rotated_access_cookie;
use axum::{Router, middleware};
use db::Database;
use jwt::JwtConfig;
use oauth::IdentityProvider;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Signing secret for access tokens
    pub access_secret: Vec<u8>,
    /// Signing secret for refresh tokens
    pub refresh_secret: Vec<u8>,
    /// Access token duration in seconds
    pub access_ttl_secs: u64,
    /// Refresh token duration in seconds
    pub refresh_ttl_secs: u64,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Identity provider for third-party sign-in
    pub identity: Arc<dyn IdentityProvider>,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::with_ttls(
        &config.access_secret,
        &config.refresh_secret,
        config.access_ttl_secs,
        config.refresh_ttl_secs,
    ));

    let api_router = create_api_router(
        config.db.clone(),
        jwt,
        config.identity.clone(),
        config.secure_cookies,
    )
    .layer(middleware::from_fn(propagate_rotated_access_cookie));

    Router::new().nest("/api", api_router)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    axum::serve(listener, app).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}
