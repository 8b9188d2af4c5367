use anyhow::{Context, Result};
use std::env;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The lifetime of a session in days.
    pub session_duration_days: i64,
    /// Email for the startup seed admin, if any.
    pub seed_admin_email: Option<String>,
    /// Password for the startup seed admin, if any.
    pub seed_admin_password: Option<String>,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            session_duration_days: env::var("SESSION_DURATION_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .context("Invalid SESSION_DURATION_DAYS")?,
            seed_admin_email: env::var("SEED_ADMIN_EMAIL").ok(),
            seed_admin_password: env::var("SEED_ADMIN_PASSWORD").ok(),
        })
    }
}
