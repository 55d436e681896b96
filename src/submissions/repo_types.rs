use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::projects::repo_types::ProjectFields;

/// Review state. `Pending` moves once to one of the two terminal states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            other => Err(format!("unknown submission status `{other}`")),
        }
    }
}

/// A terminal review outcome; `pending` is not a valid decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn status(self) -> SubmissionStatus {
        match self {
            Decision::Approved => SubmissionStatus::Approved,
            Decision::Rejected => SubmissionStatus::Rejected,
        }
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" => Ok(Decision::Approved),
            "rejected" => Ok(Decision::Rejected),
            other => Err(other.to_string()),
        }
    }
}

/// Review metadata written together by the single pending -> terminal transition.
#[derive(Debug, Clone)]
pub struct Review {
    pub decision: Decision,
    pub reviewer_id: i64,
    pub remarks: Option<String>,
    pub reviewed_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub id: i64,
    #[serde(flatten)]
    pub fields: ProjectFields,
    pub status: SubmissionStatus,
    pub student_id: i64,
    pub approved_by: Option<i64>,
    pub faculty_remarks: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub reviewed_at: Option<OffsetDateTime>,
}

/// Raw `project_submissions` row.
#[derive(Debug, sqlx::FromRow)]
pub struct SubmissionRow {
    pub id: i64,
    pub project_name: String,
    pub idea: String,
    pub team_members: Option<String>,
    pub roll_number: Option<String>,
    pub class_name: Option<String>,
    pub year: Option<i32>,
    pub branch: Option<String>,
    pub sec: Option<String>,
    pub tools: Option<String>,
    pub technologies: Option<String>,
    pub status: String,
    pub student_id: i64,
    pub approved_by: Option<i64>,
    pub faculty_remarks: Option<String>,
    pub submitted_at: OffsetDateTime,
    pub reviewed_at: Option<OffsetDateTime>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = String;

    fn try_from(r: SubmissionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            fields: ProjectFields {
                project_name: r.project_name,
                idea: r.idea,
                team_members: r.team_members,
                roll_number: r.roll_number,
                class_name: r.class_name,
                year: r.year,
                branch: r.branch,
                sec: r.sec,
                tools: r.tools,
                technologies: r.technologies,
            },
            status: r.status.parse()?,
            student_id: r.student_id,
            approved_by: r.approved_by,
            faculty_remarks: r.faculty_remarks,
            submitted_at: r.submitted_at,
            reviewed_at: r.reviewed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_terminal_states_are_decisions() {
        assert_eq!("approved".parse::<Decision>(), Ok(Decision::Approved));
        assert_eq!("Rejected".parse::<Decision>(), Ok(Decision::Rejected));
        assert!("pending".parse::<Decision>().is_err());
        assert!("approve".parse::<Decision>().is_err());
    }

    #[test]
    fn unreviewed_submission_serializes_null_review_fields() {
        let s = Submission {
            id: 1,
            fields: ProjectFields {
                project_name: "X".into(),
                idea: "Y".into(),
                ..Default::default()
            },
            status: SubmissionStatus::Pending,
            student_id: 4,
            approved_by: None,
            faculty_remarks: None,
            submitted_at: OffsetDateTime::UNIX_EPOCH,
            reviewed_at: None,
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["status"], "pending");
        assert_eq!(v["project_name"], "X");
        assert!(v["reviewed_at"].is_null());
        assert!(v["approved_by"].is_null());
    }
}
