use std::collections::HashMap;

use super::DBClient;
use crate::dtos::{
    AssignmentStanding, AssignmentSubmissionRowDto, AssignmentWithSubmissionDto, DueAssignmentDto,
    PastAssignmentDto, ProfessorAssignmentDto, StudentAssignmentsData, SubmissionDto,
    UpsertAssignmentDto,
};
use crate::models::{Assignment, SubmissionStatus};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Assignment aggregation and mutation operations
pub trait AssignmentExt {
    /// Single assignment row
    async fn get_assignment(
        &self,
        assignment_id: Uuid,
    ) -> Result<Option<Assignment>, sqlx::Error>;

    /// A student's assignments for one course, partitioned into due and past
    async fn get_student_assignments_by_course(
        &self,
        student_id: Uuid,
        course_id: Uuid,
    ) -> Result<StudentAssignmentsData, sqlx::Error>;

    /// All assignments of a course with every student submission attached
    async fn get_assignments_by_course(
        &self,
        course_id: Uuid,
    ) -> Result<Vec<ProfessorAssignmentDto>, sqlx::Error>;

    /// Create (no id) or update (id present) an assignment.
    /// The update sets all provided fields and refreshes updated_at.
    async fn upsert_assignment(
        &self,
        assignment: &UpsertAssignmentDto,
    ) -> Result<Assignment, sqlx::Error>;

    /// Wide single-assignment view for a student, with their own submission
    /// and feedback left-joined
    async fn get_assignment_with_submission_by_student(
        &self,
        student_id: Uuid,
        assignment_id: Uuid,
    ) -> Result<Vec<AssignmentWithSubmissionDto>, sqlx::Error>;

    /// Grading roster: every student of the assignment's course with their
    /// submission and feedback left-joined. RowNotFound when the assignment
    /// does not exist.
    async fn get_assignment_submissions(
        &self,
        assignment_id: Uuid,
    ) -> Result<Vec<AssignmentSubmissionRowDto>, sqlx::Error>;
}

/// Flat join row for the student assignment listing: one row per assignment,
/// submission columns NULL when the student has not submitted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StudentAssignmentRow {
    pub assignment_id: Uuid,
    pub assignment_name: String,
    pub description: Option<String>,
    pub attachment: Option<String>,
    pub due_date: DateTime<Utc>,
    pub course_id: Uuid,
    pub course_name: String,
    pub professor_id: Uuid,
    pub professor_first_name: String,
    pub professor_last_name: String,
    pub submission_id: Option<Uuid>,
    pub status: Option<SubmissionStatus>,
    pub submission: Option<String>,
}

/// Classify one row as due or past.
///
/// Past iff a submission exists OR the due date is strictly before `now`;
/// a submission moves the assignment to past immediately, independent of the
/// due date.
pub fn classify_standing(row: StudentAssignmentRow, now: DateTime<Utc>) -> AssignmentStanding {
    let professor_name = format!("{} {}", row.professor_first_name, row.professor_last_name);

    if row.submission_id.is_some() || row.due_date < now {
        AssignmentStanding::Past(PastAssignmentDto {
            assignment_id: row.assignment_id,
            assignment_name: row.assignment_name,
            description: row.description,
            attachment: row.attachment,
            due_date: row.due_date,
            course_id: row.course_id,
            course_name: row.course_name,
            professor_id: row.professor_id,
            professor_name,
            submission_id: row.submission_id,
            status: row.status,
            submission: row.submission,
        })
    } else {
        AssignmentStanding::Due(DueAssignmentDto {
            assignment_id: row.assignment_id,
            assignment_name: row.assignment_name,
            description: row.description,
            attachment: row.attachment,
            due_date: row.due_date,
            course_id: row.course_id,
            course_name: row.course_name,
            professor_id: row.professor_id,
            professor_name,
        })
    }
}

/// Partition classified rows into the two response lists.
pub fn partition_standings(
    rows: Vec<StudentAssignmentRow>,
    now: DateTime<Utc>,
) -> StudentAssignmentsData {
    let mut due_assignments = Vec::new();
    let mut past_assignments = Vec::new();

    for row in rows {
        match classify_standing(row, now) {
            AssignmentStanding::Due(assignment) => due_assignments.push(assignment),
            AssignmentStanding::Past(assignment) => past_assignments.push(assignment),
        }
    }

    StudentAssignmentsData {
        due_assignments,
        past_assignments,
    }
}

/// Assignment row for the professor listing, before submissions are attached
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AssignmentListRow {
    pub assignment_id: Uuid,
    pub assignment_name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub due_date: DateTime<Utc>,
    pub attachment: Option<String>,
    pub notes: Option<String>,
    pub course_id: Uuid,
    pub course_name: String,
    pub professor_id: Uuid,
    pub professor_first_name: String,
    pub professor_last_name: String,
}

/// Attach submissions to their assignments, grouped by assignment id.
/// Assignments nobody submitted to get an empty vec.
pub fn attach_submissions(
    assignments: Vec<AssignmentListRow>,
    submissions: Vec<SubmissionDto>,
) -> Vec<ProfessorAssignmentDto> {
    let mut by_assignment: HashMap<Uuid, Vec<SubmissionDto>> = HashMap::new();
    for submission in submissions {
        by_assignment
            .entry(submission.assignment_id)
            .or_default()
            .push(submission);
    }

    assignments
        .into_iter()
        .map(|row| ProfessorAssignmentDto {
            submissions: by_assignment.remove(&row.assignment_id).unwrap_or_default(),
            professor_name: format!("{} {}", row.professor_first_name, row.professor_last_name),
            assignment_id: row.assignment_id,
            assignment_name: row.assignment_name,
            description: row.description,
            url: row.url,
            due_date: row.due_date,
            attachment: row.attachment,
            notes: row.notes,
            course_id: row.course_id,
            course_name: row.course_name,
            professor_id: row.professor_id,
        })
        .collect()
}

const ASSIGNMENT_COLUMNS: &str = "id, url, name, due_date, attachment, description, id_course, \
                                  id_professor, notes, created_at, updated_at";

impl AssignmentExt for DBClient {
    async fn get_assignment(
        &self,
        assignment_id: Uuid,
    ) -> Result<Option<Assignment>, sqlx::Error> {
        let query = format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = $1");
        let assignment = sqlx::query_as::<_, Assignment>(&query)
            .bind(assignment_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(assignment)
    }

    async fn get_student_assignments_by_course(
        &self,
        student_id: Uuid,
        course_id: Uuid,
    ) -> Result<StudentAssignmentsData, sqlx::Error> {
        let rows = sqlx::query_as::<_, StudentAssignmentRow>(
            "SELECT a.id AS assignment_id, a.name AS assignment_name,
                    a.description, a.attachment, a.due_date,
                    c.id AS course_id, c.name AS course_name,
                    p.id AS professor_id,
                    p.first_name AS professor_first_name,
                    p.last_name AS professor_last_name,
                    sub.id AS submission_id, sub.status, sub.submission
             FROM assignments a
             INNER JOIN courses c ON a.id_course = c.id
             INNER JOIN professors p ON a.id_professor = p.id
             INNER JOIN map_courses_students mcs ON mcs.id_course = c.id
             LEFT JOIN assignments_submissions sub
                    ON sub.id_assignment = a.id AND sub.id_student = $1
             WHERE mcs.id_student = $1 AND a.id_course = $2",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(partition_standings(rows, Utc::now()))
    }

    async fn get_assignments_by_course(
        &self,
        course_id: Uuid,
    ) -> Result<Vec<ProfessorAssignmentDto>, sqlx::Error> {
        // 1. assignments of the course, with course and professor names
        let assignments = sqlx::query_as::<_, AssignmentListRow>(
            "SELECT a.id AS assignment_id, a.name AS assignment_name,
                    a.description, a.url, a.due_date, a.attachment, a.notes,
                    a.id_course AS course_id, c.name AS course_name,
                    a.id_professor AS professor_id,
                    p.first_name AS professor_first_name,
                    p.last_name AS professor_last_name
             FROM assignments a
             INNER JOIN courses c ON a.id_course = c.id
             INNER JOIN professors p ON a.id_professor = p.id
             WHERE a.id_course = $1",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        if assignments.is_empty() {
            return Ok(Vec::new());
        }

        // 2. every submission belonging to that assignment set
        let assignment_ids: Vec<Uuid> = assignments.iter().map(|a| a.assignment_id).collect();

        let submissions = sqlx::query_as::<_, SubmissionDto>(
            "SELECT sub.id AS submission_id, sub.id_assignment AS assignment_id,
                    sub.id_student AS student_id, sub.status, sub.submission
             FROM assignments_submissions sub
             WHERE sub.id_assignment = ANY($1)",
        )
        .bind(&assignment_ids)
        .fetch_all(&self.pool)
        .await?;

        // 3. group client-side by assignment id
        Ok(attach_submissions(assignments, submissions))
    }

    async fn upsert_assignment(
        &self,
        assignment: &UpsertAssignmentDto,
    ) -> Result<Assignment, sqlx::Error> {
        let saved = if let Some(assignment_id) = assignment.id {
            let query = format!(
                "UPDATE assignments
                 SET name = $1, url = $2, due_date = $3, attachment = $4,
                     description = $5, notes = $6, id_course = $7,
                     id_professor = $8, updated_at = NOW()
                 WHERE id = $9
                 RETURNING {ASSIGNMENT_COLUMNS}"
            );
            sqlx::query_as::<_, Assignment>(&query)
                .bind(&assignment.name)
                .bind(&assignment.url)
                .bind(assignment.due_date)
                .bind(&assignment.attachment)
                .bind(&assignment.description)
                .bind(&assignment.notes)
                .bind(assignment.id_course)
                .bind(assignment.id_professor)
                .bind(assignment_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?
        } else {
            let query = format!(
                "INSERT INTO assignments
                     (name, url, due_date, attachment, description, notes,
                      id_course, id_professor)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 RETURNING {ASSIGNMENT_COLUMNS}"
            );
            sqlx::query_as::<_, Assignment>(&query)
                .bind(&assignment.name)
                .bind(&assignment.url)
                .bind(assignment.due_date)
                .bind(&assignment.attachment)
                .bind(&assignment.description)
                .bind(&assignment.notes)
                .bind(assignment.id_course)
                .bind(assignment.id_professor)
                .fetch_one(&self.pool)
                .await?
        };

        Ok(saved)
    }

    async fn get_assignment_with_submission_by_student(
        &self,
        student_id: Uuid,
        assignment_id: Uuid,
    ) -> Result<Vec<AssignmentWithSubmissionDto>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AssignmentWithSubmissionDto>(
            "SELECT a.id, a.name, a.description, a.notes, a.attachment, a.url,
                    a.due_date,
                    c.id AS course_id, c.name AS course_name,
                    p.id AS professor_id,
                    CONCAT(p.first_name, ' ', p.last_name) AS professor_name,
                    sub.submission, sub.status,
                    f.description AS feedback,
                    a.created_at
             FROM assignments a
             INNER JOIN courses c ON a.id_course = c.id
             INNER JOIN professors p ON a.id_professor = p.id
             LEFT JOIN assignments_submissions sub
                    ON sub.id_assignment = a.id AND sub.id_student = $1
             LEFT JOIN feedback f ON f.id_assignment_submission = sub.id
             WHERE a.id = $2",
        )
        .bind(student_id)
        .bind(assignment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn get_assignment_submissions(
        &self,
        assignment_id: Uuid,
    ) -> Result<Vec<AssignmentSubmissionRowDto>, sqlx::Error> {
        // the course is needed to enumerate the roster; a missing assignment
        // is a hard error here, unlike the optional joins below
        let id_course: Uuid =
            sqlx::query_scalar("SELECT id_course FROM assignments WHERE id = $1")
                .bind(assignment_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;

        let rows = sqlx::query_as::<_, AssignmentSubmissionRowDto>(
            "SELECT s.id AS student_id, s.first_name, s.last_name,
                    sub.id AS submission_id, sub.submission, sub.status,
                    sub.created_at AS submitted_at,
                    f.description AS feedback,
                    a.id AS assignment_id, a.name AS assignment_name
             FROM students s
             INNER JOIN map_courses_students mcs ON mcs.id_student = s.id
             INNER JOIN assignments a ON a.id = $1
             LEFT JOIN assignments_submissions sub
                    ON sub.id_assignment = a.id AND sub.id_student = s.id
             LEFT JOIN feedback f ON f.id_assignment_submission = sub.id
             WHERE mcs.id_course = $2",
        )
        .bind(assignment_id)
        .bind(id_course)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn student_row(
        due_in: Duration,
        submission: Option<(Uuid, SubmissionStatus)>,
    ) -> StudentAssignmentRow {
        StudentAssignmentRow {
            assignment_id: Uuid::new_v4(),
            assignment_name: "Lab 1".to_string(),
            description: None,
            attachment: None,
            due_date: Utc::now() + due_in,
            course_id: Uuid::new_v4(),
            course_name: "Operating Systems".to_string(),
            professor_id: Uuid::new_v4(),
            professor_first_name: "Barbara".to_string(),
            professor_last_name: "Liskov".to_string(),
            submission_id: submission.map(|(id, _)| id),
            status: submission.map(|(_, status)| status),
            submission: submission.map(|_| "https://files.example/sub.pdf".to_string()),
        }
    }

    #[test]
    fn future_unsubmitted_assignment_is_due() {
        let now = Utc::now();
        let standing = classify_standing(student_row(Duration::days(3), None), now);
        assert!(matches!(standing, AssignmentStanding::Due(_)));
    }

    #[test]
    fn expired_assignment_is_past() {
        let now = Utc::now();
        let standing = classify_standing(student_row(Duration::days(-1), None), now);
        match standing {
            AssignmentStanding::Past(past) => assert!(past.submission_id.is_none()),
            AssignmentStanding::Due(_) => panic!("expired assignment classified as due"),
        }
    }

    #[test]
    fn submission_dominates_over_future_due_date() {
        let now = Utc::now();
        let submission = (Uuid::new_v4(), SubmissionStatus::Submitted);
        let standing = classify_standing(student_row(Duration::days(30), Some(submission)), now);
        match standing {
            AssignmentStanding::Past(past) => {
                assert_eq!(past.submission_id, Some(submission.0));
                assert_eq!(past.status, Some(SubmissionStatus::Submitted));
            }
            AssignmentStanding::Due(_) => panic!("submitted assignment classified as due"),
        }
    }

    #[test]
    fn every_row_lands_in_exactly_one_partition() {
        let rows = vec![
            student_row(Duration::days(2), None),
            student_row(Duration::days(-2), None),
            student_row(Duration::days(2), Some((Uuid::new_v4(), SubmissionStatus::Passed))),
        ];
        let total = rows.len();

        let data = partition_standings(rows, Utc::now());
        assert_eq!(data.due_assignments.len() + data.past_assignments.len(), total);
        assert_eq!(data.due_assignments.len(), 1);
        assert_eq!(data.past_assignments.len(), 2);
    }

    fn list_row(assignment_id: Uuid) -> AssignmentListRow {
        AssignmentListRow {
            assignment_id,
            assignment_name: "Essay".to_string(),
            description: None,
            url: None,
            due_date: Utc::now(),
            attachment: None,
            notes: None,
            course_id: Uuid::new_v4(),
            course_name: "Ethics".to_string(),
            professor_id: Uuid::new_v4(),
            professor_first_name: "Alan".to_string(),
            professor_last_name: "Turing".to_string(),
        }
    }

    fn submission_row(assignment_id: Uuid) -> SubmissionDto {
        SubmissionDto {
            submission_id: Uuid::new_v4(),
            assignment_id,
            student_id: Uuid::new_v4(),
            status: SubmissionStatus::Submitted,
            submission: "https://files.example/essay.pdf".to_string(),
        }
    }

    #[test]
    fn submissions_group_under_their_assignment() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let submissions = vec![submission_row(a), submission_row(a), submission_row(b)];

        let merged = attach_submissions(vec![list_row(a), list_row(b)], submissions);
        assert_eq!(merged[0].submissions.len(), 2);
        assert_eq!(merged[1].submissions.len(), 1);
    }

    #[test]
    fn assignment_without_submissions_gets_empty_vec() {
        let merged = attach_submissions(vec![list_row(Uuid::new_v4())], Vec::new());
        assert_eq!(merged.len(), 1);
        assert!(merged[0].submissions.is_empty());
    }
}
