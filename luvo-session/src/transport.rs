use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use luvo_shared::errors::{AppError, AppResult};

/// Credential handed to a client so it can join a transport channel.
#[derive(Debug, Clone, Serialize)]
pub struct TransportCredential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransportClaims {
    /// Transport UID, stringified.
    pub sub: String,
    pub channel: String,
    pub exp: i64,
    pub iat: i64,
}

/// Mints short-lived channel credentials for the media transport.
pub trait TokenIssuer: Send + Sync {
    fn mint(&self, channel: &str, transport_uid: i64) -> AppResult<TransportCredential>;
}

/// HS256 issuer. The media edge shares the secret and validates the
/// channel claim against the channel being joined.
pub struct JwtTokenIssuer {
    secret: String,
    ttl: Duration,
}

impl JwtTokenIssuer {
    pub fn new(secret: impl Into<String>, ttl_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    #[cfg(test)]
    fn verify(&self, token: &str) -> AppResult<TransportClaims> {
        use jsonwebtoken::{decode, DecodingKey, Validation};

        let data = decode::<TransportClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AppError::internal(format!("transport token rejected: {e}")))?;
        Ok(data.claims)
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn mint(&self, channel: &str, transport_uid: i64) -> AppResult<TransportCredential> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = TransportClaims {
            sub: transport_uid.to_string(),
            channel: channel.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::internal(format!("failed to sign transport token: {e}")))?;
        Ok(TransportCredential { token, expires_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_token_round_trips() {
        let issuer = JwtTokenIssuer::new("test-secret", 3600);
        let cred = issuer.mint("ch_0123456789abcdef01234567", 42).unwrap();

        let claims = issuer.verify(&cred.token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.channel, "ch_0123456789abcdef01234567");
        assert_eq!(claims.exp, cred.expires_at.timestamp());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = JwtTokenIssuer::new("test-secret", 3600);
        let other = JwtTokenIssuer::new("other-secret", 3600);
        let cred = issuer.mint("ch_abc", 7).unwrap();
        assert!(other.verify(&cred.token).is_err());
    }

    #[test]
    fn expiry_tracks_ttl() {
        let issuer = JwtTokenIssuer::new("test-secret", 60);
        let before = Utc::now();
        let cred = issuer.mint("ch_abc", 7).unwrap();
        let delta = cred.expires_at - before;
        assert!(delta >= Duration::seconds(59) && delta <= Duration::seconds(61));
    }
}
