use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use super::dto::{ReviewRequest, ReviewResponse, SubmittedResponse};
use super::repo_types::Submission;
use super::services;
use crate::{
    auth::extractors::AuthUser, error::AppResult, extract::JsonBody,
    projects::repo_types::ProjectFields, state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/submissions", get(list_pending).post(submit))
        .route("/submissions/", get(list_pending).post(submit))
        .route("/submissions/:id", put(review))
}

#[instrument(skip(state, identity, payload), fields(email = %identity.email))]
pub async fn submit(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    JsonBody(payload): JsonBody<ProjectFields>,
) -> AppResult<(StatusCode, Json<SubmittedResponse>)> {
    let submission = services::submit(&state, &identity, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmittedResponse {
            message: "Project submitted successfully",
            id: submission.id,
        }),
    ))
}

#[instrument(skip(state, identity), fields(email = %identity.email))]
pub async fn list_pending(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> AppResult<Json<Vec<Submission>>> {
    Ok(Json(services::list_pending(&state, &identity).await?))
}

#[instrument(skip(state, identity, payload), fields(email = %identity.email))]
pub async fn review(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<ReviewRequest>,
) -> AppResult<Json<ReviewResponse>> {
    let (submission, project) =
        services::review(&state, &identity, id, &payload.status, payload.remarks).await?;
    Ok(Json(ReviewResponse {
        message: format!("Submission {}", submission.status),
        submission,
        project,
    }))
}
