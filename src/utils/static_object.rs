use std::env;
use std::sync::LazyLock;

use tracing::{error, warn};

/// Filesystem root mirrored verbatim at [`UPLOAD_URL_PREFIX`](super::constant::UPLOAD_URL_PREFIX).
pub static UPLOAD_DIR: LazyLock<String> = LazyLock::new(|| {
    env::var("UPLOAD_DIR").unwrap_or_else(|_| {
        error!("Missing UPLOAD_DIR env var, using fallback './uploads'");
        "./uploads".to_string()
    })
});

pub static PORT: LazyLock<u16> = LazyLock::new(|| {
    env::var("PORT")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or_else(|| {
            warn!("Invalid or missing PORT env var, using fallback 4000");
            4000
        })
});

/// OAuth client id Google ID tokens must be issued for. Google sign-in is
/// disabled when this is unset.
pub static GOOGLE_CLIENT_ID: LazyLock<Option<String>> = LazyLock::new(|| {
    env::var("GOOGLE_CLIENT_ID")
        .ok()
        .filter(|id| !id.trim().is_empty())
});

pub static IS_PRODUCTION: LazyLock<bool> = LazyLock::new(|| {
    env::var("APP_ENV")
        .map(|env| env.eq_ignore_ascii_case("production"))
        .unwrap_or(false)
});

/// Credentials of the accounts created on first start.
pub struct SeedAccount {
    pub email: String,
    pub password: String,
}

pub static SEED_ADMIN: LazyLock<SeedAccount> = LazyLock::new(|| SeedAccount {
    email: env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string()),
    password: env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string()),
});

pub static SEED_USER: LazyLock<SeedAccount> = LazyLock::new(|| SeedAccount {
    email: env::var("SEED_USER_EMAIL").unwrap_or_else(|_| "user@example.com".to_string()),
    password: env::var("SEED_USER_PASSWORD").unwrap_or_else(|_| "user123".to_string()),
});
