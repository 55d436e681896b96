use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{claims::Identity, jwt::JwtKeys};
use crate::{config::ReadPolicy, error::AppError, state::AppState};

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::MissingCredentials)?;

    // Expect "Bearer <token>"
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::MissingCredentials)
}

/// Extracts and validates the bearer token, yielding the caller's identity.
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).map_err(|e| {
            warn!("missing bearer token");
            e
        })?;
        let keys = JwtKeys::from_ref(state);
        Ok(AuthUser(keys.verify(token)?))
    }
}

/// Caller of a read-only project endpoint, gated by the configured read policy.
///
/// Under `public` any request passes, with the identity attached when a valid
/// token happens to be present.
pub struct ProjectReader(pub Option<Identity>);

#[async_trait]
impl FromRequestParts<AppState> for ProjectReader {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match state.config.projects_read {
            ReadPolicy::Authenticated => {
                let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
                Ok(ProjectReader(Some(identity)))
            }
            ReadPolicy::Public => {
                let identity = bearer_token(parts)
                    .ok()
                    .and_then(|t| JwtKeys::from_ref(state).verify(t).ok());
                Ok(ProjectReader(identity))
            }
        }
    }
}
