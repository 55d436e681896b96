use async_trait::async_trait;

use crate::auth::repo_types::{NewUser, User};
use crate::projects::repo_types::{Project, ProjectFields};
use crate::submissions::repo_types::{Review, Submission, SubmissionStatus};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("submission already reviewed")]
    AlreadyReviewed,
    #[error(transparent)]
    Backend(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for accounts, submissions and public projects.
///
/// Every call is one unit of work: it either commits completely or leaves
/// the store untouched.
#[async_trait]
pub trait PortalStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn insert_submission(&self, student_id: i64, fields: &ProjectFields)
        -> StoreResult<Submission>;
    async fn list_submissions_by_status(
        &self,
        status: SubmissionStatus,
    ) -> StoreResult<Vec<Submission>>;
    async fn get_submission(&self, id: i64) -> StoreResult<Submission>;
    /// Moves a pending submission to its terminal state. On approval the
    /// public record is created in the same unit of work and returned.
    async fn review_submission(
        &self,
        id: i64,
        review: &Review,
    ) -> StoreResult<(Submission, Option<Project>)>;

    async fn create_project(&self, fields: &ProjectFields) -> StoreResult<Project>;
    async fn list_projects(&self) -> StoreResult<Vec<Project>>;
    /// Literal, case-sensitive substring match on name, tools and technologies.
    async fn search_projects(&self, term: &str) -> StoreResult<Vec<Project>>;
    async fn get_project(&self, id: i64) -> StoreResult<Project>;
    async fn update_project(&self, id: i64, fields: &ProjectFields) -> StoreResult<Project>;
    async fn delete_project(&self, id: i64) -> StoreResult<()>;
}
