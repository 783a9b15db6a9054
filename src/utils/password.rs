use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::ErrorMessage;

/// Maximum allowed password length in characters.
///
/// Argon2 is intentionally slow; unbounded input would let a client burn
/// server CPU with megabyte-sized passwords.
const MAX_PASSWORD_LENGTH: usize = 64;

/// Hash a password using Argon2id.
///
/// The returned string is in PHC format
/// (`$argon2id$v=19$m=19456,t=2,p=1$<salt>$<hash>`) and embeds the salt, so
/// it is the only thing that needs to be stored. Each call produces a
/// different hash for the same password; verification happens through
/// [`compare`], never by re-hashing and string equality.
pub fn hash(password: impl Into<String>) -> Result<String, ErrorMessage> {
    let password = password.into();

    if password.is_empty() {
        return Err(ErrorMessage::EmptyPassword);
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ErrorMessage::ExceededMaxPasswordLength(MAX_PASSWORD_LENGTH));
    }

    let salt = SaltString::generate(&mut OsRng);

    let hashed_password = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| ErrorMessage::HashingError)?
        .to_string();

    Ok(hashed_password)
}

/// Verify a password against a stored PHC hash in constant time.
///
/// Returns `Ok(false)` on mismatch; `Err` only for malformed input or a
/// corrupt stored hash.
pub fn compare(password: &str, hashed_password: &str) -> Result<bool, ErrorMessage> {
    if password.is_empty() {
        return Err(ErrorMessage::EmptyPassword);
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ErrorMessage::ExceededMaxPasswordLength(MAX_PASSWORD_LENGTH));
    }

    let parsed_hash =
        PasswordHash::new(hashed_password).map_err(|_| ErrorMessage::InvalidHashFormat)?;

    let password_matched = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_or(false, |_| true);

    Ok(password_matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_compare_roundtrip() {
        let hashed = hash("correct horse battery").unwrap();
        assert!(compare("correct horse battery", &hashed).unwrap());
        assert!(!compare("wrong password", &hashed).unwrap());
    }

    #[test]
    fn empty_password_is_rejected() {
        assert_eq!(hash(""), Err(ErrorMessage::EmptyPassword));
        assert_eq!(compare("", "whatever"), Err(ErrorMessage::EmptyPassword));
    }

    #[test]
    fn oversized_password_is_rejected() {
        let long = "x".repeat(MAX_PASSWORD_LENGTH + 1);
        assert_eq!(
            hash(long.clone()),
            Err(ErrorMessage::ExceededMaxPasswordLength(MAX_PASSWORD_LENGTH))
        );
    }

    #[test]
    fn garbage_hash_is_invalid_format() {
        assert_eq!(
            compare("secret", "not-a-phc-string"),
            Err(ErrorMessage::InvalidHashFormat)
        );
    }
}
