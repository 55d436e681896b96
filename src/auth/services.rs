use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::claims::Identity;
use super::dto::RegisterRequest;
use super::jwt::JwtKeys;
use super::password::{hash_password, verify_password};
use super::repo_types::{NewUser, Role, User};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Fails with `Forbidden` unless the caller holds `role`.
pub fn require_role(identity: &Identity, role: Role) -> AppResult<()> {
    if identity.role != role {
        warn!(email = %identity.email, role = %identity.role, required = %role, "forbidden");
        return Err(AppError::Forbidden(role.as_str()));
    }
    Ok(())
}

pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<User> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::InvalidRequest("Invalid email".into()));
    }

    let domain = &state.config.allowed_email_domain;
    if !email.ends_with(&format!("@{domain}")) {
        warn!(email = %email, "email outside institutional domain");
        return Err(AppError::DomainNotAllowed(domain.clone()));
    }

    let role: Role = req.role.parse().map_err(AppError::InvalidRequest)?;

    let full_name = req.full_name.trim();
    if full_name.is_empty() {
        return Err(AppError::InvalidRequest("full_name is required".into()));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let password_hash = hash_password(&req.password)?;
    // The unique index still catches a concurrent registration of the same email.
    let user = state
        .store
        .create_user(NewUser {
            email,
            full_name: full_name.to_string(),
            role,
            password_hash,
        })
        .await?;

    info!(user_id = user.id, email = %user.email, role = %user.role, "user registered");
    Ok(user)
}

/// Checks the password and issues a token bound to the account's email and role.
pub async fn authenticate(state: &AppState, email: &str, password: &str) -> AppResult<(String, User)> {
    let email = normalize_email(email);

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(email = %email, user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(state).issue(&user.email, user.role)?;
    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok((token, user))
}

/// Loads the account named by a verified token.
pub async fn current_user(state: &AppState, identity: &Identity) -> AppResult<User> {
    state
        .store
        .find_user_by_email(&identity.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %identity.email, "token for unknown account");
            AppError::InvalidToken
        })
}

/// Finds the account behind `identity`, requiring `role`.
pub async fn acting_user(state: &AppState, identity: &Identity, role: Role) -> AppResult<User> {
    require_role(identity, role)?;
    current_user(state, identity).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_req(email: &str, role: &str) -> RegisterRequest {
        RegisterRequest {
            full_name: "Test User".into(),
            email: email.into(),
            password: "testpass123".into(),
            role: role.into(),
        }
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(is_valid_email("alice@inst.edu"));
        assert!(!is_valid_email("alice@inst"));
        assert!(!is_valid_email("alice inst.edu"));
        assert!(!is_valid_email("@inst.edu"));
    }

    #[tokio::test]
    async fn duplicate_email_fails_second_time() {
        let state = AppState::fake();
        register(&state, register_req("alice@inst.edu", "student"))
            .await
            .expect("first registration");
        let err = register(&state, register_req("Alice@Inst.edu ", "faculty"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[tokio::test]
    async fn foreign_domain_is_rejected() {
        let state = AppState::fake();
        let err = register(&state, register_req("alice@gmail.com", "student"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DomainNotAllowed(_)));

        let err = register(&state, register_req("alice@evilinst.edu", "student"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DomainNotAllowed(_)));
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let state = AppState::fake();
        let err = register(&state, register_req("carol@inst.edu", "admin"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn stored_hash_verifies_only_original_password() {
        let state = AppState::fake();
        let user = register(&state, register_req("alice@inst.edu", "student"))
            .await
            .unwrap();
        assert_ne!(user.password_hash, "testpass123");
        assert!(verify_password("testpass123", &user.password_hash).unwrap());
        assert!(!verify_password("testpass12", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn authenticate_issues_token_with_email_and_role() {
        let state = AppState::fake();
        register(&state, register_req("bob@inst.edu", "faculty"))
            .await
            .unwrap();

        let (token, user) = authenticate(&state, "bob@inst.edu", "testpass123")
            .await
            .expect("login");
        assert_eq!(user.role, Role::Faculty);

        let identity = JwtKeys::from_ref(&state).verify(&token).unwrap();
        assert_eq!(identity.email, "bob@inst.edu");
        assert_eq!(identity.role, Role::Faculty);
    }

    #[tokio::test]
    async fn authenticate_rejects_bad_credentials() {
        let state = AppState::fake();
        register(&state, register_req("bob@inst.edu", "faculty"))
            .await
            .unwrap();

        let err = authenticate(&state, "bob@inst.edu", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let err = authenticate(&state, "nobody@inst.edu", "testpass123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[test]
    fn require_role_is_strict() {
        let student = Identity {
            email: "alice@inst.edu".into(),
            role: Role::Student,
        };
        assert!(require_role(&student, Role::Student).is_ok());
        assert!(matches!(
            require_role(&student, Role::Faculty),
            Err(AppError::Forbidden("faculty"))
        ));
    }
}
