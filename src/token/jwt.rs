use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::{Payload, TokenError, TokenMaker};
use crate::config::MIN_SYMMETRIC_KEY_LEN;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    jti: Uuid,
    sub: String,
    iat: i64,
    exp: i64,
}

/// HS256 token maker
pub struct JwtMaker {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtMaker {
    pub fn new(secret_key: &str) -> Result<Self, TokenError> {
        if secret_key.len() < MIN_SYMMETRIC_KEY_LEN {
            return Err(TokenError::InvalidKeySize {
                min: MIN_SYMMETRIC_KEY_LEN,
                actual: secret_key.len(),
            });
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret_key.as_bytes()),
        })
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }

    fn issue(
        &self,
        username: &str,
        issued_at: DateTime<Utc>,
        duration: Duration,
    ) -> Result<(String, Payload), TokenError> {
        let duration = chrono::Duration::from_std(duration).map_err(|_| TokenError::InvalidDuration)?;
        // JWT timestamps have second resolution
        let issued_at = issued_at.trunc_subsecs(0);
        let expired_at = issued_at
            .checked_add_signed(duration)
            .ok_or(TokenError::InvalidDuration)?;

        let payload = Payload {
            id: Uuid::new_v4(),
            username: username.to_string(),
            issued_at,
            expired_at,
        };
        let claims = Claims {
            jti: payload.id,
            sub: payload.username.clone(),
            iat: issued_at.timestamp(),
            exp: expired_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok((token, payload))
    }
}

impl TokenMaker for JwtMaker {
    fn create_token(
        &self,
        username: &str,
        duration: Duration,
    ) -> Result<(String, Payload), TokenError> {
        self.issue(username, Utc::now(), duration)
    }

    fn verify_token(&self, token: &str) -> Result<Payload, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Self::validation()).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
                _ => TokenError::InvalidToken,
            },
        )?;
        let claims = data.claims;

        let issued_at = Utc
            .timestamp_opt(claims.iat, 0)
            .single()
            .ok_or(TokenError::InvalidToken)?;
        let expired_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(TokenError::InvalidToken)?;

        let payload = Payload {
            id: claims.jti,
            username: claims.sub,
            issued_at,
            expired_at,
        };
        if payload.is_expired_at(Utc::now()) {
            return Err(TokenError::ExpiredToken);
        }
        Ok(payload)
    }
}
