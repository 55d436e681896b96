use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{PortalStore, StoreError, StoreResult};
use crate::auth::repo_types::{NewUser, User};
use crate::projects::repo_types::{Project, ProjectFields};
use crate::submissions::repo_types::{Decision, Review, Submission, SubmissionStatus};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    submissions: BTreeMap<i64, Submission>,
    projects: BTreeMap<i64, Project>,
    next_user: i64,
    next_submission: i64,
    next_project: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn insert_project(&mut self, fields: &ProjectFields) -> Project {
        let project = Project {
            id: next_id(&mut self.next_project),
            fields: fields.clone(),
        };
        self.projects.insert(project.id, project.clone());
        project
    }
}

/// Process-local store; ids start at 1 per table, like a fresh database.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortalStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let created = User {
            id: next_id(&mut t.next_user),
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            password_hash: user.password_hash,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_submission(
        &self,
        student_id: i64,
        fields: &ProjectFields,
    ) -> StoreResult<Submission> {
        let mut t = self.tables.write().await;
        let submission = Submission {
            id: next_id(&mut t.next_submission),
            fields: fields.clone(),
            status: SubmissionStatus::Pending,
            student_id,
            approved_by: None,
            faculty_remarks: None,
            submitted_at: OffsetDateTime::now_utc(),
            reviewed_at: None,
        };
        t.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn list_submissions_by_status(
        &self,
        status: SubmissionStatus,
    ) -> StoreResult<Vec<Submission>> {
        let t = self.tables.read().await;
        Ok(t.submissions
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect())
    }

    async fn get_submission(&self, id: i64) -> StoreResult<Submission> {
        let t = self.tables.read().await;
        t.submissions.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn review_submission(
        &self,
        id: i64,
        review: &Review,
    ) -> StoreResult<(Submission, Option<Project>)> {
        let mut t = self.tables.write().await;
        let submission = t.submissions.get_mut(&id).ok_or(StoreError::NotFound)?;
        if submission.status != SubmissionStatus::Pending {
            return Err(StoreError::AlreadyReviewed);
        }
        submission.status = review.decision.status();
        submission.approved_by = Some(review.reviewer_id);
        submission.faculty_remarks = review.remarks.clone();
        submission.reviewed_at = Some(review.reviewed_at);
        let updated = submission.clone();

        let project = match review.decision {
            Decision::Approved => Some(t.insert_project(&updated.fields)),
            Decision::Rejected => None,
        };
        Ok((updated, project))
    }

    async fn create_project(&self, fields: &ProjectFields) -> StoreResult<Project> {
        Ok(self.tables.write().await.insert_project(fields))
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        Ok(self.tables.read().await.projects.values().cloned().collect())
    }

    async fn search_projects(&self, term: &str) -> StoreResult<Vec<Project>> {
        let t = self.tables.read().await;
        Ok(t.projects
            .values()
            .filter(|p| p.fields.matches(term))
            .cloned()
            .collect())
    }

    async fn get_project(&self, id: i64) -> StoreResult<Project> {
        let t = self.tables.read().await;
        t.projects.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update_project(&self, id: i64, fields: &ProjectFields) -> StoreResult<Project> {
        let mut t = self.tables.write().await;
        let project = t.projects.get_mut(&id).ok_or(StoreError::NotFound)?;
        project.fields = fields.clone();
        Ok(project.clone())
    }

    async fn delete_project(&self, id: i64) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.projects.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::Role;

    fn fields(name: &str) -> ProjectFields {
        ProjectFields {
            project_name: name.into(),
            idea: "idea".into(),
            ..Default::default()
        }
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            full_name: "Someone".into(),
            role: Role::Student,
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn ids_start_at_one_per_table() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@inst.edu")).await.unwrap();
        let sub = store.insert_submission(user.id, &fields("X")).await.unwrap();
        let proj = store.create_project(&fields("P")).await.unwrap();
        assert_eq!((user.id, sub.id, proj.id), (1, 1, 1));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@inst.edu")).await.unwrap();
        let err = store.create_user(new_user("a@inst.edu")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn second_review_is_refused() {
        let store = MemoryStore::new();
        let sub = store.insert_submission(1, &fields("X")).await.unwrap();
        let review = Review {
            decision: Decision::Rejected,
            reviewer_id: 2,
            remarks: None,
            reviewed_at: OffsetDateTime::now_utc(),
        };
        store.review_submission(sub.id, &review).await.unwrap();
        let err = store.review_submission(sub.id, &review).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyReviewed));
    }

    #[tokio::test]
    async fn delete_missing_project_is_not_found() {
        let store = MemoryStore::new();
        let err = store.delete_project(42).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
