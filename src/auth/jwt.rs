use std::time::Duration;

use anyhow::Context;
use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use super::claims::{Claims, Identity};
use super::repo_types::Role;
use crate::{config::JwtConfig, error::AppError, state::AppState};

/// HS256 signing and verification keys with issuer/audience/ttl settings.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(u64::try_from(cfg.ttl_minutes).unwrap_or(0).saturating_mul(60)),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn issue(&self, email: &str, role: Role) -> anyhow::Result<String> {
        self.issue_at(email, role, OffsetDateTime::now_utc())
    }

    /// Sign a token as if issued at `now`; expiry is `now + ttl`.
    pub fn issue_at(&self, email: &str, role: Role, now: OffsetDateTime) -> anyhow::Result<String> {
        let ttl = i64::try_from(self.ttl.as_secs()).context("token lifetime too large")?;
        let exp = now
            .checked_add(TimeDuration::seconds(ttl))
            .context("token expiry out of range")?;
        let claims = Claims {
            sub: email.to_string(),
            role,
            iat: now.unix_timestamp().max(0) as usize,
            exp: exp.unix_timestamp().max(0) as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(email = %email, role = %role, "jwt signed");
        Ok(token)
    }

    /// Signature, issuer, audience and expiry must all check out. No revocation.
    pub fn verify(&self, token: &str) -> Result<Identity, AppError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            warn!(error = %e, "jwt rejected");
            AppError::InvalidToken
        })?;
        debug!(email = %data.claims.sub, role = %data.claims.role, "jwt verified");
        Ok(data.claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 30,
        })
    }

    #[test]
    fn issued_token_verifies_to_same_identity() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.issue("alice@inst.edu", Role::Student).expect("sign");
        let identity = keys.verify(&token).expect("verify");
        assert_eq!(
            identity,
            Identity {
                email: "alice@inst.edu".into(),
                role: Role::Student
            }
        );
    }

    #[test]
    fn token_valid_until_expiry_window() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let issued = OffsetDateTime::now_utc() - TimeDuration::minutes(29);
        let token = keys.issue_at("bob@inst.edu", Role::Faculty, issued).unwrap();
        assert!(keys.verify(&token).is_ok());
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let issued = OffsetDateTime::now_utc() - TimeDuration::minutes(31);
        let token = keys.issue_at("bob@inst.edu", Role::Faculty, issued).unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn token_is_rejected_once_exp_has_passed() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let just_inside = OffsetDateTime::now_utc() - TimeDuration::minutes(30) + TimeDuration::seconds(5);
        let token = keys.issue_at("bob@inst.edu", Role::Faculty, just_inside).unwrap();
        assert!(keys.verify(&token).is_ok());

        let just_outside = OffsetDateTime::now_utc() - TimeDuration::minutes(30) - TimeDuration::seconds(2);
        let token = keys.issue_at("bob@inst.edu", Role::Faculty, just_outside).unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn oversized_lifetime_fails_to_sign_instead_of_panicking() {
        let mut keys = make_keys("dev-secret", "iss", "aud");
        keys.ttl = Duration::from_secs(100_000_000_000 * 60);
        let err = keys.issue("alice@inst.edu", Role::Student).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        keys.ttl = Duration::from_secs(u64::MAX);
        assert!(keys.issue("alice@inst.edu", Role::Student).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let other = make_keys("other-secret", "iss", "aud");
        let token = other.issue("alice@inst.edu", Role::Student).unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let good = make_keys("same-secret", "iss", "good-aud");
        let bad = make_keys("same-secret", "iss", "bad-aud");
        let token = good.issue("alice@inst.edu", Role::Student).unwrap();
        assert!(matches!(bad.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn malformed_token_is_rejected() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert!(matches!(keys.verify("not.a.jwt"), Err(AppError::InvalidToken)));
        assert!(matches!(keys.verify(""), Err(AppError::InvalidToken)));
    }
}
