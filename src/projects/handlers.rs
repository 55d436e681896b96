use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{DeletedResponse, SearchQuery};
use super::repo_types::{Project, ProjectFields};
use super::services;
use crate::{
    auth::extractors::{AuthUser, ProjectReader},
    error::AppResult,
    extract::JsonBody,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/", get(list_projects).post(create_project))
        .route("/projects/search", get(search_projects))
        .route(
            "/projects/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
}

// --- handlers ---

#[instrument(skip(state, reader), fields(reader = ?reader.as_ref().map(|i| &i.email)))]
pub async fn list_projects(
    State(state): State<AppState>,
    ProjectReader(reader): ProjectReader,
) -> AppResult<Json<Vec<Project>>> {
    Ok(Json(services::list_projects(&state).await?))
}

#[instrument(skip(state, reader), fields(reader = ?reader.as_ref().map(|i| &i.email)))]
pub async fn search_projects(
    State(state): State<AppState>,
    ProjectReader(reader): ProjectReader,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<Project>>> {
    Ok(Json(services::search(&state, &query.q).await?))
}

#[instrument(skip(state, reader), fields(reader = ?reader.as_ref().map(|i| &i.email)))]
pub async fn get_project(
    State(state): State<AppState>,
    ProjectReader(reader): ProjectReader,
    Path(id): Path<i64>,
) -> AppResult<Json<Project>> {
    Ok(Json(services::get(&state, id).await?))
}

#[instrument(skip(state, identity, payload), fields(email = %identity.email))]
pub async fn create_project(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    JsonBody(payload): JsonBody<ProjectFields>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let project = services::create(&state, &identity, payload).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

#[instrument(skip(state, identity, payload), fields(email = %identity.email))]
pub async fn update_project(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<ProjectFields>,
) -> AppResult<Json<Project>> {
    Ok(Json(services::update(&state, &identity, id, payload).await?))
}

#[instrument(skip(state, identity), fields(email = %identity.email))]
pub async fn delete_project(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<DeletedResponse>> {
    services::delete(&state, &identity, id).await?;
    Ok(Json(DeletedResponse {
        detail: "Project deleted successfully",
    }))
}
