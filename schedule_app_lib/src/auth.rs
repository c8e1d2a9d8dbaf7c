use anyhow::{Error, format_err};
use rand::{Rng, thread_rng};
use stack_string::StackString;
use uuid::Uuid;

use crate::{models::PasswordHistory, pgpool::PgPool};

/// Number of previous password hashes a new password is checked against.
pub const PASSWORD_HISTORY_DEPTH: i64 = 5;

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// # Errors
/// Returns error if hashing fails
pub fn hash_password(plain: &str) -> Result<StackString, Error> {
    let salt: [u8; 16] = thread_rng().r#gen();
    argon2::hash_encoded(plain.as_bytes(), &salt, &argon2::Config::default())
        .map(Into::into)
        .map_err(Into::into)
}

/// # Errors
/// Returns error if the stored hash is malformed
pub fn verify_password(encoded: &str, plain: &str) -> Result<bool, Error> {
    argon2::verify_encoded(encoded, plain.as_bytes()).map_err(Into::into)
}

#[must_use]
pub fn generate_secure_code(length: usize) -> StackString {
    let mut rng = thread_rng();
    (0..length)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect::<String>()
        .into()
}

/// # Errors
/// Returns error describing the first failed rule
pub fn validate_username(username: &str) -> Result<(), Error> {
    if username.len() < 3 || username.len() > 32 {
        return Err(format_err!("Username must be between 3 and 32 characters"));
    }
    let mut chars = username.chars();
    let leading_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    if !leading_letter || !chars.all(|c| c.is_ascii_alphanumeric()) {
        return Err(format_err!(
            "Username must be alphanumeric, start with a letter, and have no spaces"
        ));
    }
    Ok(())
}

/// # Errors
/// Returns error describing the first failed rule
pub fn validate_password(password: &str) -> Result<(), Error> {
    if password.len() < 8 {
        return Err(format_err!("Password must be at least 8 characters"));
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_ascii_alphanumeric());
    if !has_upper || !has_digit || !has_special {
        return Err(format_err!(
            "Password must include a capital letter, a number, and a special character"
        ));
    }
    Ok(())
}

/// True when `candidate` matches one of the user's recently stored hashes.
///
/// # Errors
/// Returns error on database failure
pub async fn password_reused(user_id: Uuid, candidate: &str, pool: &PgPool) -> Result<bool, Error> {
    let history = PasswordHistory::get_recent(user_id, PASSWORD_HISTORY_DEPTH, pool).await?;
    for entry in history {
        if verify_password(&entry.password, candidate).unwrap_or(false) {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use crate::auth::{
        generate_secure_code, hash_password, validate_password, validate_username, verify_password,
    };

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Sup3r-secret").unwrap();
        assert!(verify_password(&hash, "Sup3r-secret").unwrap());
        assert!(!verify_password(&hash, "Sup3r-wrong").unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("Sup3r-secret").unwrap();
        let second = hash_password("Sup3r-secret").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_generate_secure_code() {
        let code = generate_secure_code(6);
        assert_eq!(code.len(), 6);
        assert!(
            code.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice42").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username("42alice").is_err());
        assert!(validate_username("alice smith").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Passw0rd!").is_ok());
        assert!(validate_password("short1!").is_err());
        assert!(validate_password("passw0rd!").is_err());
        assert!(validate_password("Password!").is_err());
        assert!(validate_password("Passw0rdd").is_err());
    }
}
