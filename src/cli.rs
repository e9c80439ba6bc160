//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::{Database, UserRole};
use crate::jwt::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS};
use crate::oauth::{DisabledIdentityProvider, IdentityProvider};
use crate::password::hash_password;
use clap::Parser;
use rand::{Rng, distr::Alphanumeric};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

const MIN_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Propcanvas",
    about = "Property listing service with dual-token session management"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7310")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "propcanvas.db")]
    pub database: String,

    /// Access token duration in seconds
    #[arg(long, default_value_t = DEFAULT_ACCESS_TTL_SECS)]
    pub access_ttl: u64,

    /// Refresh token duration in seconds
    #[arg(long, default_value_t = DEFAULT_REFRESH_TTL_SECS)]
    pub refresh_ttl: u64,

    /// Set the Secure flag on auth cookies (requires HTTPS in front)
    #[arg(long)]
    pub secure_cookies: bool,

    /// Path to file containing the access token secret.
    /// Prefer using the ACCESS_TOKEN_SECRET env var instead
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret.
    /// Prefer using the REFRESH_TOKEN_SECRET env var instead
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Create or promote an admin user on startup (requires --admin-email)
    #[arg(long)]
    pub create_admin: bool,

    /// Email address for --create-admin
    #[arg(long)]
    pub admin_email: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// The two signing secrets, one per token kind.
pub struct TokenSecrets {
    pub access: Vec<u8>,
    pub refresh: Vec<u8>,
}

fn load_secret(env_var: &str, file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            "Token secret is required. Set the {} environment variable (recommended) or use a secret file",
            env_var
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_var, MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Load both token secrets from environment variables or files.
/// The two secrets must differ, otherwise the token kinds would share a
/// signing key. Returns None and logs an error if either cannot be loaded.
pub fn load_token_secrets(
    access_file: Option<&str>,
    refresh_file: Option<&str>,
) -> Option<TokenSecrets> {
    let access = load_secret("ACCESS_TOKEN_SECRET", access_file)?;
    let refresh = load_secret("REFRESH_TOKEN_SECRET", refresh_file)?;

    if access == refresh {
        error!("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must not be the same value");
        return None;
    }

    Some(TokenSecrets {
        access: access.into_bytes(),
        refresh: refresh.into_bytes(),
    })
}

/// Handle the --create-admin flag: create a new admin with a generated
/// password, or promote an existing user to admin.
pub async fn handle_create_admin(db: &Database, admin_email: Option<&str>) {
    let Some(email) = admin_email else {
        error!("--create-admin requires --admin-email");
        std::process::exit(1);
    };

    match db.users().get_by_email(email).await {
        Ok(Some(existing)) => {
            if existing.role == UserRole::Admin {
                println!();
                println!("User {} is already an admin", email);
                println!();
                return;
            }
            match db.users().set_role(&existing.uuid, UserRole::Admin).await {
                Ok(_) => {
                    println!();
                    println!("User {} promoted to admin", email);
                    println!();
                }
                Err(e) => {
                    error!(error = %e, "Failed to promote admin user");
                    std::process::exit(1);
                }
            }
        }
        Ok(None) => {
            let password: String = rand::rng()
                .sample_iter(&Alphanumeric)
                .take(20)
                .map(char::from)
                .collect();
            let password_hash = match hash_password(&password) {
                Ok(hash) => hash,
                Err(e) => {
                    error!(error = %e, "Failed to hash admin password");
                    std::process::exit(1);
                }
            };

            let uuid = Uuid::new_v4().to_string();
            match db
                .users()
                .create_admin(&uuid, "Admin", email, &password_hash)
                .await
            {
                Ok(_) => {
                    println!();
                    println!("Admin user created: {}", email);
                    println!("Password: {}", password);
                    println!();
                }
                Err(e) => {
                    error!(error = %e, "Failed to create admin user");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing admin");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, secrets: TokenSecrets) -> ServerConfig {
    let identity: Arc<dyn IdentityProvider> = Arc::new(DisabledIdentityProvider);

    ServerConfig {
        db,
        access_secret: secrets.access,
        refresh_secret: secrets.refresh,
        access_ttl_secs: args.access_ttl,
        refresh_ttl_secs: args.refresh_ttl,
        secure_cookies: args.secure_cookies,
        identity,
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
