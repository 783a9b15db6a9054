use super::DBClient;
use crate::models::{Professor, Student, UserAccount};
use uuid::Uuid;

/// Account lookup operations across the two disjoint user tables
pub trait UserExt {
    /// Get a single account by ID or username.
    /// Professors and students are queried together via UNION ALL; usernames
    /// are unique per table and expected to be unique across both.
    async fn get_account(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
    ) -> Result<Option<UserAccount>, sqlx::Error>;

    /// All professors, for course-form population
    async fn get_professors(&self) -> Result<Vec<Professor>, sqlx::Error>;

    /// All students, for course-form population
    async fn get_students(&self) -> Result<Vec<Student>, sqlx::Error>;
}

const ACCOUNT_COLUMNS: &str = "id, username, password, role, first_name, last_name, email";

impl UserExt for DBClient {
    async fn get_account(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
    ) -> Result<Option<UserAccount>, sqlx::Error> {
        let mut account: Option<UserAccount> = None;

        if let Some(user_id) = user_id {
            let query = format!(
                "SELECT {cols} FROM professors WHERE id = $1
                 UNION ALL
                 SELECT {cols} FROM students WHERE id = $1",
                cols = ACCOUNT_COLUMNS
            );
            account = sqlx::query_as::<_, UserAccount>(&query)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        } else if let Some(username) = username {
            let query = format!(
                "SELECT {cols} FROM professors WHERE username = $1
                 UNION ALL
                 SELECT {cols} FROM students WHERE username = $1",
                cols = ACCOUNT_COLUMNS
            );
            account = sqlx::query_as::<_, UserAccount>(&query)
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        }

        Ok(account)
    }

    async fn get_professors(&self) -> Result<Vec<Professor>, sqlx::Error> {
        let professors = sqlx::query_as::<_, Professor>(
            "SELECT id, username, password, role, first_name, last_name, email,
                    created_at, updated_at
             FROM professors
             ORDER BY last_name, first_name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(professors)
    }

    async fn get_students(&self) -> Result<Vec<Student>, sqlx::Error> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT id, username, password, role, first_name, last_name, email,
                    created_at, updated_at
             FROM students
             ORDER BY last_name, first_name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }
}
