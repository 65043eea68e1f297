pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;

use api::{create_api_router, create_auth_router};
use auth::{AuthMethod, AuthProvider, TokenVerifier};
use axum::Router;
use db::Database;
use jwt::{JwtConfig, JwtError, JwtSettings};
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Revocation strategy for refresh tokens.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RevocationStrategy {
    /// Signature and expiry alone decide validity
    #[default]
    AlwaysValid,
    /// Logged-out refresh tokens are recorded and rejected
    Denylist,
}

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Signing key, issuer and token lifetimes
    pub jwt: JwtSettings,
    /// How refresh token identifiers are checked for revocation
    pub revocation: RevocationStrategy,
    /// Which authenticator handles `/auth/login`
    pub auth_method: AuthMethod,
    /// Login attempts a single IP can make in a burst
    pub login_burst: u32,
    /// Trusted proxy header for the client IP, `None` uses the socket address
    pub ip_extractor: Option<cli::IpExtractor>,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Result<Router, JwtError> {
    let jwt = Arc::new(JwtConfig::new(&config.jwt)?);

    let verifier = match config.revocation {
        RevocationStrategy::AlwaysValid => TokenVerifier::AlwaysValid,
        RevocationStrategy::Denylist => TokenVerifier::Denylist(config.db.revoked_tokens()),
    };

    let authenticator = AuthProvider::new(config.auth_method, config.db.users());

    let auth_router = create_auth_router(
        config.db.clone(),
        jwt.clone(),
        verifier,
        authenticator,
        RateLimitConfig::new(config.login_burst, config.ip_extractor),
    );

    Ok(Router::new()
        .nest("/auth", auth_router)
        .nest("/api", create_api_router(jwt)))
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config).map_err(std::io::Error::other)?;
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    init_cleanup(&config.db).await;

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
