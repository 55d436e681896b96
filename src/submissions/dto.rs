use serde::{Deserialize, Serialize};

use super::repo_types::Submission;
use crate::projects::repo_types::Project;

#[derive(Debug, Serialize)]
pub struct SubmittedResponse {
    pub message: &'static str,
    pub id: i64,
}

/// Request body for `PUT /submissions/{id}`.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: String,
    #[serde(default, alias = "faculty_remarks")]
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub message: String,
    pub submission: Submission,
    pub project: Option<Project>,
}
