use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{LoginRequest, LoginResponse, MeResponse, PublicUser, RegisterRequest, RegisterResponse},
    extractors::AuthUser,
    services,
};
use crate::{error::AppResult, extract::JsonBody, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> AppResult<Json<RegisterResponse>> {
    let user = services::register(&state, payload).await?;
    Ok(Json(RegisterResponse {
        message: "User registered successfully",
        user_id: user.id,
    }))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (access_token, user) =
        services::authenticate(&state, &payload.email, &payload.password).await?;
    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer",
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, identity), fields(email = %identity.email))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> AppResult<Json<MeResponse>> {
    let user = services::current_user(&state, &identity).await?;
    Ok(Json(user.into()))
}
