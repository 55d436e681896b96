use tracing::info;

use super::repo_types::{Project, ProjectFields};
use crate::auth::repo_types::Role;
use crate::auth::services::require_role;
use crate::auth::Identity;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::submissions::services::validate_fields;

pub async fn list_projects(state: &AppState) -> AppResult<Vec<Project>> {
    Ok(state.store.list_projects().await?)
}

/// Substring search over name, tools and technologies. An empty term lists everything.
pub async fn search(state: &AppState, term: &str) -> AppResult<Vec<Project>> {
    if term.is_empty() {
        return list_projects(state).await;
    }
    Ok(state.store.search_projects(term).await?)
}

pub async fn get(state: &AppState, id: i64) -> AppResult<Project> {
    state
        .store
        .get_project(id)
        .await
        .map_err(|e| AppError::from_store(e, "Project"))
}

/// Publishes a project directly, bypassing the submission workflow.
pub async fn create(
    state: &AppState,
    identity: &Identity,
    fields: ProjectFields,
) -> AppResult<Project> {
    require_role(identity, Role::Faculty)?;
    validate_fields(&fields)?;
    let project = state.store.create_project(&fields).await?;
    info!(project_id = project.id, by = %identity.email, "project created");
    Ok(project)
}

/// Full overwrite of the descriptive fields.
pub async fn update(
    state: &AppState,
    identity: &Identity,
    id: i64,
    fields: ProjectFields,
) -> AppResult<Project> {
    require_role(identity, Role::Faculty)?;
    validate_fields(&fields)?;
    let project = state
        .store
        .update_project(id, &fields)
        .await
        .map_err(|e| AppError::from_store(e, "Project"))?;
    info!(project_id = id, by = %identity.email, "project updated");
    Ok(project)
}

pub async fn delete(state: &AppState, identity: &Identity, id: i64) -> AppResult<()> {
    require_role(identity, Role::Faculty)?;
    state
        .store
        .delete_project(id)
        .await
        .map_err(|e| AppError::from_store(e, "Project"))?;
    info!(project_id = id, by = %identity.email, "project deleted");
    Ok(())
}
