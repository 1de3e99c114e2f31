//! CLI argument parsing, validation, and startup helpers.

use std::time::Duration;

use crate::ServerConfig;
use crate::db::{Database, UserRole};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tokengate",
    about = "Email and password sessions with JWT access and refresh tokens"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Path to SQLite database file (":memory:" for a throwaway database)
    #[arg(short, long, default_value = "tokengate.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime, e.g. "45s", "30m", "12h", "30d"
    #[arg(long, env = "JWT_ACCESS_EXPIRATION", default_value = "30m", value_parser = parse_ttl)]
    pub access_ttl: Duration,

    /// Refresh token lifetime, same format as --access-ttl
    #[arg(long, env = "JWT_REFRESH_EXPIRATION", default_value = "30d", value_parser = parse_ttl)]
    pub refresh_ttl: Duration,

    /// Grant the admin role to an existing user on startup
    #[arg(long, value_name = "EMAIL")]
    pub promote_admin: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Parse a lifetime: an integer with an optional `s`, `m`, `h` or `d` suffix.
/// A bare integer is seconds. Zero is rejected.
pub fn parse_ttl(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (digits, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], Some(c)),
        _ => (s, None),
    };

    let multiplier: u64 = match unit {
        None | Some('s') => 1,
        Some('m') => 60,
        Some('h') => 60 * 60,
        Some('d') => 24 * 60 * 60,
        Some(other) => return Err(format!("Unknown time unit '{}' in '{}'", other, s)),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("Invalid duration: '{}'", s));
    }

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("Invalid duration: '{}'", s))?;
    if value == 0 {
        return Err("Duration must be greater than zero".to_string());
    }

    let secs = value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Duration too large: '{}'", s))?;
    Ok(Duration::from_secs(secs))
}

/// Initialize logging based on the specified format.
/// `RUST_LOG` controls the filter, defaulting to `info`.
pub fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
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

    check_secret_length(secret)
}

fn check_secret_length(secret: String) -> Option<String> {
    if secret.chars().count() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }
    Some(secret)
}

/// Handle the --promote-admin flag. Only an existing user can be promoted.
/// Returns false and logs an error if the promotion failed.
pub async fn handle_promote_admin(db: &Database, email: &str) -> bool {
    match db.users().set_role_by_email(email, UserRole::Admin).await {
        Ok(true) => {
            info!(email = %email, "User promoted to admin");
            true
        }
        Ok(false) => {
            error!(email = %email, "Cannot promote: no user with this email");
            false
        }
        Err(e) => {
            error!(email = %email, error = %e, "Failed to promote user");
            false
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    jwt_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
) -> ServerConfig {
    if refresh_ttl <= access_ttl {
        warn!(
            access_ttl = access_ttl.as_secs(),
            refresh_ttl = refresh_ttl.as_secs(),
            "Refresh tokens do not outlive access tokens"
        );
    }

    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        access_ttl,
        refresh_ttl,
        password_params: argon2::Params::default(),
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
