use time::OffsetDateTime;
use tracing::{info, warn};

use super::repo_types::{Decision, Review, Submission, SubmissionStatus};
use crate::auth::repo_types::Role;
use crate::auth::services::{acting_user, require_role};
use crate::auth::Identity;
use crate::error::{AppError, AppResult};
use crate::projects::repo_types::{Project, ProjectFields};
use crate::state::AppState;

/// Name and idea are the only required descriptive fields.
pub(crate) fn validate_fields(fields: &ProjectFields) -> AppResult<()> {
    if fields.project_name.trim().is_empty() {
        return Err(AppError::InvalidRequest("project_name is required".into()));
    }
    if fields.idea.trim().is_empty() {
        return Err(AppError::InvalidRequest("idea is required".into()));
    }
    Ok(())
}

/// Stores a new `pending` submission owned by the calling student.
pub async fn submit(
    state: &AppState,
    identity: &Identity,
    fields: ProjectFields,
) -> AppResult<Submission> {
    let student = acting_user(state, identity, Role::Student).await?;
    validate_fields(&fields).map_err(|e| {
        warn!(student_id = student.id, error = %e, "submission rejected");
        e
    })?;

    let submission = state.store.insert_submission(student.id, &fields).await?;
    info!(
        submission_id = submission.id,
        student_id = student.id,
        project_name = %submission.fields.project_name,
        "submission created"
    );
    Ok(submission)
}

pub async fn list_pending(state: &AppState, identity: &Identity) -> AppResult<Vec<Submission>> {
    require_role(identity, Role::Faculty)?;
    Ok(state
        .store
        .list_submissions_by_status(SubmissionStatus::Pending)
        .await?)
}

/// Applies a faculty decision; approval also publishes a copy as a public project.
pub async fn review(
    state: &AppState,
    identity: &Identity,
    submission_id: i64,
    status: &str,
    remarks: Option<String>,
) -> AppResult<(Submission, Option<Project>)> {
    let reviewer = acting_user(state, identity, Role::Faculty).await?;
    let decision: Decision = status.parse().map_err(|bad: String| {
        warn!(submission_id, decision = %bad, "invalid decision");
        AppError::InvalidDecision(bad)
    })?;

    let review = Review {
        decision,
        reviewer_id: reviewer.id,
        remarks: Some(remarks.unwrap_or_default()),
        reviewed_at: OffsetDateTime::now_utc(),
    };
    let (submission, project) = state
        .store
        .review_submission(submission_id, &review)
        .await
        .map_err(|e| AppError::from_store(e, "Submission"))?;

    info!(
        submission_id,
        reviewer_id = reviewer.id,
        status = %submission.status,
        project_id = project.as_ref().map(|p| p.id),
        "submission reviewed"
    );
    Ok((submission, project))
}
