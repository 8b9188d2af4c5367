use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder,
};
use deadpool_postgres::Pool;
use rand::{rngs::OsRng, RngCore};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::error::{AppError, Result};
use crate::models::user::{User, UserRole};
use crate::repositories::user as user_repo;

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 2;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 1;

/// Hashes a password using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the hashed password.
pub fn hash_password(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("Salt encoding error: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Internal(format!("Argon2 params: {}", e)))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Internal(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    Ok(password_hash)
}

/// Verifies a password against a stored hash.
///
/// A malformed stored hash counts as a failed verification, never a fault:
/// the caller only learns that the credentials did not match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let mut password_bytes = password.as_bytes().to_vec();

    let matched = match PasswordHash::new(hash) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(&password_bytes, &parsed_hash)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash failed to parse: {}", e);
            false
        }
    };

    password_bytes.zeroize();
    matched
}

/// Creates the seed admin account at startup if it does not exist yet.
///
/// Idempotent: a user already holding the email leaves the store untouched.
pub async fn ensure_seed_admin(pool: &Pool, email: &str, password: &str) -> Result<User> {
    let email = email.trim().to_lowercase();

    if let Some(existing) = user_repo::find_by_email(pool, &email).await? {
        tracing::debug!("Seed admin already present: {}", existing.id);
        return Ok(existing);
    }

    let password_hash = hash_password(password)?;
    let user = user_repo::create_user(
        pool,
        Uuid::new_v4(),
        &email,
        "System",
        "Administrator",
        &password_hash,
        UserRole::Admin,
    )
    .await?;

    tracing::info!("✅ Seed admin created: {}", user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("password123").unwrap();
        let second = hash_password("password123").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_is_a_failed_verification() {
        assert!(!verify_password("password123", "not-a-phc-string"));
        assert!(!verify_password("password123", ""));
    }
}
