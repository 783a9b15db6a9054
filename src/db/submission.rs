use super::DBClient;
use crate::models::{Feedback, Submission, SubmissionStatus};
use uuid::Uuid;

/// Submission lifecycle operations
pub trait SubmissionExt {
    /// The live submission for (assignment, student), if any
    async fn check_submission(
        &self,
        assignment_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<Submission>, sqlx::Error>;

    /// First-time submission: inserts a row with status 'submitted'
    async fn create_submission(
        &self,
        assignment_id: Uuid,
        student_id: Uuid,
        file_url: &str,
    ) -> Result<Submission, sqlx::Error>;

    /// Resubmission: points the existing row at the freshly uploaded file
    async fn update_submission_file(
        &self,
        assignment_id: Uuid,
        student_id: Uuid,
        file_url: &str,
    ) -> Result<Submission, sqlx::Error>;

    /// Set the grading status (any transition is permitted) and reconcile
    /// feedback: existing + empty text deletes the row, existing + text
    /// overwrites it, absent + text inserts one, absent + empty is a no-op.
    /// Runs in a single transaction.
    async fn grade_submission(
        &self,
        submission_id: Uuid,
        new_status: SubmissionStatus,
        feedback_text: &str,
    ) -> Result<(), sqlx::Error>;
}

const SUBMISSION_COLUMNS: &str =
    "id, status, submission, id_assignment, id_student, created_at, updated_at";

impl SubmissionExt for DBClient {
    async fn check_submission(
        &self,
        assignment_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<Submission>, sqlx::Error> {
        let query = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM assignments_submissions
             WHERE id_assignment = $1 AND id_student = $2"
        );
        let submission = sqlx::query_as::<_, Submission>(&query)
            .bind(assignment_id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(submission)
    }

    async fn create_submission(
        &self,
        assignment_id: Uuid,
        student_id: Uuid,
        file_url: &str,
    ) -> Result<Submission, sqlx::Error> {
        let query = format!(
            "INSERT INTO assignments_submissions (submission, id_assignment, id_student)
             VALUES ($1, $2, $3)
             RETURNING {SUBMISSION_COLUMNS}"
        );
        let submission = sqlx::query_as::<_, Submission>(&query)
            .bind(file_url)
            .bind(assignment_id)
            .bind(student_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(submission)
    }

    async fn update_submission_file(
        &self,
        assignment_id: Uuid,
        student_id: Uuid,
        file_url: &str,
    ) -> Result<Submission, sqlx::Error> {
        let query = format!(
            "UPDATE assignments_submissions
             SET submission = $1, updated_at = NOW()
             WHERE id_assignment = $2 AND id_student = $3
             RETURNING {SUBMISSION_COLUMNS}"
        );
        let submission = sqlx::query_as::<_, Submission>(&query)
            .bind(file_url)
            .bind(assignment_id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        Ok(submission)
    }

    async fn grade_submission(
        &self,
        submission_id: Uuid,
        new_status: SubmissionStatus,
        feedback_text: &str,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // 1. status update; any transition from any state is allowed
        let result = sqlx::query(
            "UPDATE assignments_submissions SET status = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(new_status)
        .bind(submission_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        // 2. reconcile feedback against the submitted text
        let existing = sqlx::query_as::<_, Feedback>(
            "SELECT id, description, id_assignment_submission FROM feedback
             WHERE id_assignment_submission = $1",
        )
        .bind(submission_id)
        .fetch_optional(&mut *tx)
        .await?;

        let has_text = !feedback_text.trim().is_empty();

        match (existing, has_text) {
            (Some(_), false) => {
                sqlx::query("DELETE FROM feedback WHERE id_assignment_submission = $1")
                    .bind(submission_id)
                    .execute(&mut *tx)
                    .await?;
            }
            (Some(_), true) => {
                sqlx::query(
                    "UPDATE feedback SET description = $1 WHERE id_assignment_submission = $2",
                )
                .bind(feedback_text)
                .bind(submission_id)
                .execute(&mut *tx)
                .await?;
            }
            (None, true) => {
                sqlx::query(
                    "INSERT INTO feedback (description, id_assignment_submission) VALUES ($1, $2)",
                )
                .bind(feedback_text)
                .bind(submission_id)
                .execute(&mut *tx)
                .await?;
            }
            (None, false) => {}
        }

        tx.commit().await?;

        Ok(())
    }
}
