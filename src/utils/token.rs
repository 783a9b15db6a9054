use axum::http::StatusCode;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorMessage, HttpError};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

pub fn create_token(
    user_id: &str,
    secret: &[u8],
    expires_in_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    if user_id.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + Duration::seconds(expires_in_seconds)).timestamp() as usize;
    let claims = TokenClaims {
        sub: user_id.to_string(),
        iat,
        exp,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<String, HttpError> {
    // Validation::new() also rejects expired tokens.
    let decode = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    );

    match decode {
        Ok(token) => Ok(token.claims.sub),
        Err(_) => Err(HttpError::new(
            ErrorMessage::InvalidToken.to_string(),
            StatusCode::UNAUTHORIZED,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn create_then_decode_roundtrip() {
        let token = create_token("some-user-id", SECRET, 60).unwrap();
        let sub = decode_token(token, SECRET).unwrap();
        assert_eq!(sub, "some-user-id");
    }

    #[test]
    fn empty_subject_is_rejected() {
        assert!(create_token("", SECRET, 60).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = create_token("some-user-id", SECRET, -120).unwrap();
        assert!(decode_token(token, SECRET).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token("some-user-id", SECRET, 60).unwrap();
        assert!(decode_token(token, b"other-secret").is_err());
    }
}
