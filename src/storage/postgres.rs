use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::debug;

use super::{PortalStore, StoreError, StoreResult};
use crate::auth::repo_types::{NewUser, User, UserRow};
use crate::projects::repo_types::{Project, ProjectFields, ProjectRow};
use crate::submissions::repo_types::{
    Decision, Review, Submission, SubmissionRow, SubmissionStatus,
};

/// Postgres-backed store behind a sqlx connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

fn decode<T, R>(row: R) -> StoreResult<T>
where
    T: TryFrom<R, Error = String>,
{
    T::try_from(row).map_err(|e| StoreError::Backend(sqlx::Error::Decode(e.into())))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl PortalStore for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (email, hashed_password, full_name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, full_name, role, hashed_password, is_active, created_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateEmail
            } else {
                e.into()
            }
        })?;
        decode(row)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, full_name, role, hashed_password, is_active, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(decode).transpose()
    }

    async fn insert_submission(
        &self,
        student_id: i64,
        fields: &ProjectFields,
    ) -> StoreResult<Submission> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            INSERT INTO project_submissions
                (project_name, idea, team_members, roll_number, class_name, year,
                 branch, sec, tools, technologies, status, student_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', $11)
            RETURNING id, project_name, idea, team_members, roll_number, class_name, year,
                      branch, sec, tools, technologies, status, student_id, approved_by,
                      faculty_remarks, submitted_at, reviewed_at
            "#,
        )
        .bind(&fields.project_name)
        .bind(&fields.idea)
        .bind(&fields.team_members)
        .bind(&fields.roll_number)
        .bind(&fields.class_name)
        .bind(fields.year)
        .bind(&fields.branch)
        .bind(&fields.sec)
        .bind(&fields.tools)
        .bind(&fields.technologies)
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        decode(row)
    }

    async fn list_submissions_by_status(
        &self,
        status: SubmissionStatus,
    ) -> StoreResult<Vec<Submission>> {
        let rows = sqlx::query_as::<_, SubmissionRow>(
            r#"
            SELECT id, project_name, idea, team_members, roll_number, class_name, year,
                   branch, sec, tools, technologies, status, student_id, approved_by,
                   faculty_remarks, submitted_at, reviewed_at
            FROM project_submissions
            WHERE status = $1
            ORDER BY id
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(decode).collect()
    }

    async fn get_submission(&self, id: i64) -> StoreResult<Submission> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            SELECT id, project_name, idea, team_members, roll_number, class_name, year,
                   branch, sec, tools, technologies, status, student_id, approved_by,
                   faculty_remarks, submitted_at, reviewed_at
            FROM project_submissions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        decode(row)
    }

    async fn review_submission(
        &self,
        id: i64,
        review: &Review,
    ) -> StoreResult<(Submission, Option<Project>)> {
        let mut tx = self.pool.begin().await?;

        // The status guard makes the pending -> terminal transition happen once.
        let updated = sqlx::query_as::<_, SubmissionRow>(
            r#"
            UPDATE project_submissions
               SET status = $2, approved_by = $3, faculty_remarks = $4, reviewed_at = $5
             WHERE id = $1 AND status = 'pending'
            RETURNING id, project_name, idea, team_members, roll_number, class_name, year,
                      branch, sec, tools, technologies, status, student_id, approved_by,
                      faculty_remarks, submitted_at, reviewed_at
            "#,
        )
        .bind(id)
        .bind(review.decision.status().as_str())
        .bind(review.reviewer_id)
        .bind(&review.remarks)
        .bind(review.reviewed_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = updated else {
            let exists: Option<(i64,)> =
                sqlx::query_as("SELECT id FROM project_submissions WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match exists {
                Some(_) => StoreError::AlreadyReviewed,
                None => StoreError::NotFound,
            });
        };
        let submission: Submission = decode(row)?;

        let project = match review.decision {
            Decision::Approved => {
                let f = &submission.fields;
                let row = sqlx::query_as::<_, ProjectRow>(
                    r#"
                    INSERT INTO projects
                        (project_name, idea, team_members, roll_number, class_name, year,
                         branch, sec, tools, technologies)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    RETURNING id, project_name, idea, team_members, roll_number, class_name,
                              year, branch, sec, tools, technologies
                    "#,
                )
                .bind(&f.project_name)
                .bind(&f.idea)
                .bind(&f.team_members)
                .bind(&f.roll_number)
                .bind(&f.class_name)
                .bind(f.year)
                .bind(&f.branch)
                .bind(&f.sec)
                .bind(&f.tools)
                .bind(&f.technologies)
                .fetch_one(&mut *tx)
                .await?;
                Some(Project::from(row))
            }
            Decision::Rejected => None,
        };

        tx.commit().await?;
        debug!(submission_id = id, status = %submission.status, "review committed");
        Ok((submission, project))
    }

    async fn create_project(&self, fields: &ProjectFields) -> StoreResult<Project> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            INSERT INTO projects
                (project_name, idea, team_members, roll_number, class_name, year,
                 branch, sec, tools, technologies)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, project_name, idea, team_members, roll_number, class_name,
                      year, branch, sec, tools, technologies
            "#,
        )
        .bind(&fields.project_name)
        .bind(&fields.idea)
        .bind(&fields.team_members)
        .bind(&fields.roll_number)
        .bind(&fields.class_name)
        .bind(fields.year)
        .bind(&fields.branch)
        .bind(&fields.sec)
        .bind(&fields.tools)
        .bind(&fields.technologies)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, project_name, idea, team_members, roll_number, class_name,
                   year, branch, sec, tools, technologies
            FROM projects
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn search_projects(&self, term: &str) -> StoreResult<Vec<Project>> {
        // strpos keeps `%` and `_` in the term literal, unlike LIKE.
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, project_name, idea, team_members, roll_number, class_name,
                   year, branch, sec, tools, technologies
            FROM projects
            WHERE strpos(project_name, $1) > 0
               OR strpos(COALESCE(tools, ''), $1) > 0
               OR strpos(COALESCE(technologies, ''), $1) > 0
            ORDER BY id
            "#,
        )
        .bind(term)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn get_project(&self, id: i64) -> StoreResult<Project> {
        sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, project_name, idea, team_members, roll_number, class_name,
                   year, branch, sec, tools, technologies
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Project::from)
        .ok_or(StoreError::NotFound)
    }

    async fn update_project(&self, id: i64, fields: &ProjectFields) -> StoreResult<Project> {
        sqlx::query_as::<_, ProjectRow>(
            r#"
            UPDATE projects
               SET project_name = $2, idea = $3, team_members = $4, roll_number = $5,
                   class_name = $6, year = $7, branch = $8, sec = $9, tools = $10,
                   technologies = $11
             WHERE id = $1
            RETURNING id, project_name, idea, team_members, roll_number, class_name,
                      year, branch, sec, tools, technologies
            "#,
        )
        .bind(id)
        .bind(&fields.project_name)
        .bind(&fields.idea)
        .bind(&fields.team_members)
        .bind(&fields.roll_number)
        .bind(&fields.class_name)
        .bind(fields.year)
        .bind(&fields.branch)
        .bind(&fields.sec)
        .bind(&fields.tools)
        .bind(&fields.technologies)
        .fetch_optional(&self.pool)
        .await?
        .map(Project::from)
        .ok_or(StoreError::NotFound)
    }

    async fn delete_project(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
