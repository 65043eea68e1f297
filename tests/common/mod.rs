#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
};
use mover::{
    RevocationStrategy, ServerConfig,
    auth::AuthMethod,
    cli::{ClientIpHeader, IpExtractor},
    create_app,
    db::{Database, Role},
    jwt::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS, JwtConfig, JwtSettings},
    password::PasswordHasher,
};
use std::net::SocketAddr;
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"test-jwt-secret-for-testing-only!";
pub const TEST_ISSUER: &str = "mover-test";
pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Peer address given to requests that do not set their own `ConnectInfo`.
pub const DEFAULT_PEER: &str = "127.0.0.1:40000";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

/// Builder for test apps with various options
pub struct TestSetup {
    access_ttl: u64,
    revocation: RevocationStrategy,
    login_burst: u32,
    ip_header: Option<ClientIpHeader>,
}

impl TestSetup {
    pub fn new() -> Self {
        Self {
            access_ttl: DEFAULT_ACCESS_TTL_SECS,
            revocation: RevocationStrategy::AlwaysValid,
            login_burst: 100,
            ip_header: None,
        }
    }

    pub fn with_access_ttl(mut self, secs: u64) -> Self {
        self.access_ttl = secs;
        self
    }

    pub fn with_revocation(mut self, revocation: RevocationStrategy) -> Self {
        self.revocation = revocation;
        self
    }

    pub fn with_login_burst(mut self, burst: u32) -> Self {
        self.login_burst = burst;
        self
    }

    pub fn with_ip_header(mut self, header: ClientIpHeader) -> Self {
        self.ip_header = Some(header);
        self
    }

    pub async fn build(self) -> TestApp {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let settings = JwtSettings {
            signing_key: TEST_SECRET.to_vec(),
            issuer: TEST_ISSUER.to_string(),
            access_ttl: self.access_ttl,
            refresh_ttl: DEFAULT_REFRESH_TTL_SECS,
        };
        let jwt = JwtConfig::new(&settings).expect("Invalid JWT settings");
        let config = ServerConfig {
            db: db.clone(),
            jwt: settings,
            revocation: self.revocation,
            auth_method: AuthMethod::Password,
            login_burst: self.login_burst,
            ip_extractor: self.ip_header.map(IpExtractor::from),
        };
        let app = create_app(&config).expect("Failed to create app");
        TestApp { app, db, jwt }
    }
}

pub async fn setup() -> TestApp {
    TestSetup::new().build().await
}

/// Store a user with a cheap password hash. Returns the user ID.
pub async fn create_user(db: &Database, username: &str, roles: &[Role]) -> i64 {
    let hash = PasswordHasher::new(8, 1, 1)
        .unwrap()
        .hash(TEST_PASSWORD)
        .unwrap();
    db.users().create(username, &hash, roles).await.unwrap()
}

impl TestApp {
    /// Send a request and return the status and JSON body (Null if empty or not JSON).
    /// Requests without `ConnectInfo` get `DEFAULT_PEER`, as the real server
    /// attaches the socket address to every request.
    pub async fn send(&self, mut request: Request<Body>) -> (StatusCode, serde_json::Value) {
        if request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .is_none()
        {
            let peer: SocketAddr = DEFAULT_PEER.parse().unwrap();
            request.extensions_mut().insert(ConnectInfo(peer));
        }
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    pub async fn post_login(&self, body: &str) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Log in and return (access_token, refresh_token).
    pub async fn login(&self, username: &str, password: &str) -> (String, String) {
        let body = serde_json::json!({ "username": username, "password": password });
        let (status, json) = self.post_login(&body.to_string()).await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", json);
        (
            json["token"].as_str().unwrap().to_string(),
            json["refreshToken"].as_str().unwrap().to_string(),
        )
    }

    /// Send a request with `Authorization: Bearer <token>`.
    pub async fn with_bearer(
        &self,
        method: &str,
        uri: &str,
        token: &str,
    ) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn whoami(&self, access_token: &str) -> (StatusCode, serde_json::Value) {
        self.with_bearer("GET", "/api/whoami", access_token).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> (StatusCode, serde_json::Value) {
        self.with_bearer("GET", "/auth/token", refresh_token).await
    }

    pub async fn logout(&self, refresh_token: &str) -> (StatusCode, serde_json::Value) {
        self.with_bearer("POST", "/auth/logout", refresh_token).await
    }
}
