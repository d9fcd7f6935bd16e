use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user_id
    pub email: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

/// Caller identity attached to a request once its bearer token verifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("No token provided")]
    Missing,

    #[error("Invalid token")]
    Invalid,

    #[error("Token expired")]
    Expired,

    #[error("Token verification failed: {0}")]
    Other(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => TokenError::Invalid,
            _ => TokenError::Other(err.to_string()),
        }
    }
}

pub fn create_jwt(user_id: &str, email: &str, secret: &str, ttl_secs: u64) -> Result<String> {
    let now = Utc::now();
    let expiration = i64::try_from(ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| anyhow::anyhow!("token lifetime of {}s overflows the clock", ttl_secs))?;

    let claims = Claims {
        sub: user_id.to_owned(),
        email: email.to_owned(),
        iat: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
        jti: uuid::Uuid::new_v4().to_string(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

/// Verifies signature and expiry. No clock leeway: a token is rejected from
/// the second its `exp` passes.
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;

    Ok(token_data.claims)
}

/// Verifies an `Authorization` header value and yields the caller identity.
pub fn authenticate(authorization: Option<&str>, secret: &str) -> Result<Identity, TokenError> {
    let token = authorization
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(TokenError::Missing)?;

    validate_jwt(token, secret).map(Identity::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_expired_secs_ago(secret: &str, secs: i64) -> String {
        let past = (Utc::now().timestamp() - secs) as usize;
        let claims = Claims {
            sub: "user_123".to_string(),
            email: "a@b.io".to_string(),
            iat: past - 60,
            exp: past,
            jti: "j".to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
        .unwrap()
    }

    #[test]
    fn test_jwt_cycle() {
        let secret = "test_secret";
        let token = create_jwt("user_123", "a@b.io", secret, 60).unwrap();
        let claims = validate_jwt(&token, secret).unwrap();
        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.email, "a@b.io");
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = create_jwt("user_123", "a@b.io", "one", 60).unwrap();
        assert_eq!(validate_jwt(&token, "two").unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn test_expired_token() {
        let token = token_expired_secs_ago("s", 3600);
        assert_eq!(validate_jwt(&token, "s").unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_recently_expired_token_gets_no_grace() {
        let token = token_expired_secs_ago("s", 5);
        assert_eq!(validate_jwt(&token, "s").unwrap_err(), TokenError::Expired);

        let header = format!("Bearer {}", token_expired_secs_ago("s", 30));
        assert_eq!(
            authenticate(Some(&header), "s").unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_oversized_lifetime_is_an_error() {
        assert!(create_jwt("u1", "u1@x.io", "s", u64::MAX).is_err());
        assert!(create_jwt("u1", "u1@x.io", "s", i64::MAX as u64).is_err());
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        assert_eq!(
            validate_jwt("not-a-jwt", "s").unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn test_authenticate_header() {
        let token = create_jwt("u1", "u1@x.io", "s", 60).unwrap();
        let header = format!("Bearer {}", token);

        let identity = authenticate(Some(&header), "s").unwrap();
        assert_eq!(
            identity,
            Identity {
                id: "u1".to_string(),
                email: "u1@x.io".to_string()
            }
        );

        assert_eq!(authenticate(None, "s").unwrap_err(), TokenError::Missing);
        assert_eq!(
            authenticate(Some(&token), "s").unwrap_err(),
            TokenError::Missing
        );
        assert_eq!(
            authenticate(Some("Bearer "), "s").unwrap_err(),
            TokenError::Missing
        );
    }
}
