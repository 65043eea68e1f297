//! CLI argument parsing, validation, and startup helpers.

use crate::auth::AuthMethod;
use crate::db::{Database, Role};
use crate::jwt::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS, JwtSettings, MAX_TTL_SECS};
use crate::password::PasswordHasher;
use crate::rate_limit::DEFAULT_LOGIN_BURST;
use crate::{RevocationStrategy, ServerConfig};
use clap::Parser;
use std::net::IpAddr;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Proxy header carrying the real client IP.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientIpHeader {
    /// `X-Forwarded-For`, the last entry is the one appended by the proxy
    XForwardedFor,
    /// `X-Real-IP`
    XRealIp,
    /// `CF-Connecting-IP`
    CfConnectingIp,
}

/// Reads the client IP from a trusted proxy header.
#[derive(Clone, Copy, Debug)]
pub struct IpExtractor {
    pub header_name: &'static str,
    parse: fn(&str) -> Result<String, &'static str>,
}

impl IpExtractor {
    /// Parse the client IP out of the header value.
    pub fn extract(&self, header_value: &str) -> Result<String, &'static str> {
        (self.parse)(header_value)
    }
}

impl From<ClientIpHeader> for IpExtractor {
    fn from(header: ClientIpHeader) -> Self {
        match header {
            ClientIpHeader::XForwardedFor => Self {
                header_name: "x-forwarded-for",
                parse: parse_last_forwarded,
            },
            ClientIpHeader::XRealIp => Self {
                header_name: "x-real-ip",
                parse: parse_single_ip,
            },
            ClientIpHeader::CfConnectingIp => Self {
                header_name: "cf-connecting-ip",
                parse: parse_single_ip,
            },
        }
    }
}

fn parse_single_ip(value: &str) -> Result<String, &'static str> {
    value
        .trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|_| "IP header does not contain a valid IP address")
}

// Earlier entries are whatever the client sent; only the proxy's own is trusted.
fn parse_last_forwarded(value: &str) -> Result<String, &'static str> {
    let last = value.rsplit(',').next().ok_or("IP header is empty")?;
    parse_single_ip(last)
}

#[derive(Parser, Debug, Clone)]
#[command(name = "mover", about = "Authentication service for the mover backend")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "mover.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Value of the `iss` claim in issued tokens
    #[arg(long, default_value = "mover")]
    pub issuer: String,

    /// Access token lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_ACCESS_TTL_SECS, value_parser = ttl_parser())]
    pub access_ttl: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_REFRESH_TTL_SECS, value_parser = ttl_parser())]
    pub refresh_ttl: u64,

    /// How refresh tokens are checked for revocation
    #[arg(long, value_enum, default_value = "always-valid")]
    pub revocation: RevocationStrategy,

    /// Login method accepted at /auth/login
    #[arg(long, value_enum, default_value = "password")]
    pub auth_method: AuthMethod,

    /// Login attempts a single IP can make in a burst before being throttled
    #[arg(long, default_value_t = DEFAULT_LOGIN_BURST)]
    pub login_burst: u32,

    /// Read the client IP from this proxy header instead of the socket address.
    /// Only set this behind a reverse proxy that overwrites the header
    #[arg(long, value_enum)]
    pub ip_header: Option<ClientIpHeader>,

    /// Create a user with this username on startup
    #[arg(long)]
    pub create_user: Option<String>,

    /// Roles granted to the user created with --create-user
    #[arg(long, value_enum, value_delimiter = ',', default_value = "user")]
    pub roles: Vec<Role>,

    /// Password for the user created with --create-user
    #[arg(long, env = "CREATE_USER_PASSWORD", hide_env_values = true)]
    pub create_user_password: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn ttl_parser() -> clap::builder::RangedU64ValueParser<u64> {
    clap::value_parser!(u64).range(1..=MAX_TTL_SECS)
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Handle the --create-user flag. Returns false if the user could not be created.
pub async fn handle_create_user(
    db: &Database,
    username: &str,
    password: Option<&str>,
    roles: &[Role],
) -> bool {
    let Some(password) = password.filter(|p| !p.is_empty()) else {
        error!("--create-user requires the CREATE_USER_PASSWORD environment variable");
        return false;
    };

    match db.users().get_by_username(username).await {
        Ok(Some(_)) => {
            info!(username = %username, "User already exists, not creating");
            return true;
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "Failed to check for existing user");
            return false;
        }
    }

    let hash = match PasswordHasher::default().hash(password) {
        Ok(hash) => hash,
        Err(e) => {
            error!(error = %e, "Failed to hash password");
            return false;
        }
    };

    match db.users().create(username, &hash, roles).await {
        Ok(id) => {
            let roles: Vec<&str> = roles.iter().map(Role::authority).collect();
            info!(id, username = %username, roles = ?roles, "User created");
            true
        }
        Err(e) => {
            error!(error = %e, "Failed to create user");
            false
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> ServerConfig {
    ServerConfig {
        db,
        jwt: JwtSettings {
            signing_key: jwt_secret.into_bytes(),
            issuer: args.issuer.clone(),
            access_ttl: args.access_ttl,
            refresh_ttl: args.refresh_ttl,
        },
        revocation: args.revocation,
        auth_method: args.auth_method,
        login_burst: args.login_burst,
        ip_extractor: args.ip_header.map(IpExtractor::from),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
