use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::{Assignment, Course, Professor, Student, Submission, SubmissionStatus, UserAccount};

// DTOs define the structure of data exchanged with clients. They are
// separate from database models to control exactly what data is exposed.

// ============================================================================
// Authentication DTOs
// ============================================================================

/// Login request - username + password, checked against both account tables
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Password is required and must be less than 255 characters"
    ))]
    pub password: String,
}

/// Login success response with JWT token and session claims
#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub access_token: String,
    pub user: FilterUserDto,
}

// ============================================================================
// User Response DTOs (filtered data for clients)
// ============================================================================

/// Account data sent to clients - excludes the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
}

impl FilterUserDto {
    pub fn filter_account(account: &UserAccount) -> Self {
        FilterUserDto {
            id: account.id.to_string(),
            username: account.username.to_owned(),
            first_name: account.first_name.to_owned(),
            last_name: account.last_name.to_owned(),
            email: account.email.to_owned(),
            role: account.role.to_str().to_string(),
        }
    }

    pub fn filter_professor(professor: &Professor) -> Self {
        FilterUserDto {
            id: professor.id.to_string(),
            username: professor.username.to_owned(),
            first_name: professor.first_name.to_owned(),
            last_name: professor.last_name.to_owned(),
            email: professor.email.to_owned(),
            role: professor.role.to_str().to_string(),
        }
    }

    pub fn filter_student(student: &Student) -> Self {
        FilterUserDto {
            id: student.id.to_string(),
            username: student.username.to_owned(),
            first_name: student.first_name.to_owned(),
            last_name: student.last_name.to_owned(),
            email: student.email.to_owned(),
            role: student.role.to_str().to_string(),
        }
    }

    pub fn filter_professors(professors: &[Professor]) -> Vec<FilterUserDto> {
        professors.iter().map(FilterUserDto::filter_professor).collect()
    }

    pub fn filter_students(students: &[Student]) -> Vec<FilterUserDto> {
        students.iter().map(FilterUserDto::filter_student).collect()
    }
}

/// Single user response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: UserData,
}

/// User list with count
#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponseDto {
    pub status: String,
    pub users: Vec<FilterUserDto>,
    pub results: i64,
}

/// Generic success response
#[derive(Serialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

// ============================================================================
// Course DTOs
// ============================================================================

/// Course create/update request.
///
/// When `id` is present the course row is updated and BOTH membership lists
/// are replaced wholesale (delete-then-reinsert): the caller always submits
/// the complete desired membership, never a diff.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpsertCourseDto {
    pub id: Option<Uuid>,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 1, message = "Select at least one professor"))]
    pub professors: Vec<Uuid>,

    pub students: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertCourseResponseDto {
    pub status: String,
    pub message: String,
    pub id: Uuid,
}

/// Student enrolled in a course, as shown on the professor's roster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrolledStudentDto {
    pub student_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub email: String,
}

/// One course the professor teaches, with every enrolled student attached.
/// `students` is empty (never omitted) when nobody is enrolled yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseWithStudentsDto {
    pub course_id: Uuid,
    pub course_name: String,
    pub professor_id: Uuid,
    pub professor_first_name: String,
    pub professor_last_name: String,
    pub professor_role: String,
    pub students: Vec<EnrolledStudentDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CoursesWithStudentsResponseDto {
    pub status: String,
    pub data: Vec<CourseWithStudentsDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudentCoursesResponseDto {
    pub status: String,
    pub data: Vec<Course>,
}

// ============================================================================
// Assignment DTOs
// ============================================================================

/// Assignment create/update request (multipart form fields; the attachment
/// file itself is uploaded by the handler and arrives here as a URL).
///
/// Defaults are explicit: a fresh form value starts from `Default` and the
/// handler overwrites whatever fields the client actually sent.
#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct UpsertAssignmentDto {
    pub id: Option<Uuid>,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(url(message = "Invalid URL"))]
    pub url: Option<String>,

    #[validate(custom(function = "validate_future_date"))]
    pub due_date: DateTime<Utc>,

    #[validate(url(message = "Invalid attachment URL"))]
    pub attachment: Option<String>,

    pub description: Option<String>,

    pub notes: Option<String>,

    #[validate(custom(function = "validate_required_uuid"))]
    pub id_course: Uuid,

    #[validate(custom(function = "validate_required_uuid"))]
    pub id_professor: Uuid,
}

impl Default for UpsertAssignmentDto {
    fn default() -> Self {
        UpsertAssignmentDto {
            id: None,
            name: String::new(),
            url: None,
            // invalid until the form sets a real date
            due_date: DateTime::<Utc>::UNIX_EPOCH,
            attachment: None,
            description: None,
            notes: None,
            id_course: Uuid::nil(),
            id_professor: Uuid::nil(),
        }
    }
}

/// Due date must lie strictly in the future. Only meaningfully enforced at
/// creation time; the update path reuses the same validated object.
fn validate_future_date(due_date: &DateTime<Utc>) -> Result<(), ValidationError> {
    if *due_date > Utc::now() {
        Ok(())
    } else {
        Err(ValidationError::new("due_date_past").with_message("Due date must be in the future!".into()))
    }
}

fn validate_required_uuid(id: &Uuid) -> Result<(), ValidationError> {
    if id.is_nil() {
        Err(ValidationError::new("required").with_message("Required".into()))
    } else {
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssignmentResponseDto {
    pub status: String,
    pub message: String,
    pub data: Assignment,
}

// ============================================================================
// Student assignment partition DTOs
// ============================================================================

/// Assignment still open for the student: no submission yet and the due date
/// has not passed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DueAssignmentDto {
    pub assignment_id: Uuid,
    pub assignment_name: String,
    pub description: Option<String>,
    pub attachment: Option<String>,
    pub due_date: DateTime<Utc>,
    pub course_id: Uuid,
    pub course_name: String,
    pub professor_id: Uuid,
    pub professor_name: String,
}

/// Assignment behind the student: submitted, or past its due date (or both).
/// Submission fields are None for an unsubmitted assignment whose date
/// simply expired.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PastAssignmentDto {
    pub assignment_id: Uuid,
    pub assignment_name: String,
    pub description: Option<String>,
    pub attachment: Option<String>,
    pub due_date: DateTime<Utc>,
    pub course_id: Uuid,
    pub course_name: String,
    pub professor_id: Uuid,
    pub professor_name: String,
    pub submission_id: Option<Uuid>,
    pub status: Option<SubmissionStatus>,
    pub submission: Option<String>,
}

/// Explicit discriminant for the two assignment shapes a student sees.
///
/// A row is `Past` if a submission exists OR the due date is strictly in the
/// past; submission presence dominates over the date comparison.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "standing", rename_all = "lowercase")]
pub enum AssignmentStanding {
    Due(DueAssignmentDto),
    Past(PastAssignmentDto),
}

#[derive(Debug, Serialize)]
pub struct StudentAssignmentsData {
    pub due_assignments: Vec<DueAssignmentDto>,
    pub past_assignments: Vec<PastAssignmentDto>,
}

#[derive(Debug, Serialize)]
pub struct StudentAssignmentsResponseDto {
    pub status: String,
    pub data: StudentAssignmentsData,
}

// ============================================================================
// Professor assignment aggregation DTOs
// ============================================================================

/// One student submission row under a professor's assignment view
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct SubmissionDto {
    pub submission_id: Uuid,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    pub status: SubmissionStatus,
    pub submission: String,
}

/// Assignment with all of its submissions attached; `submissions` is empty
/// (never omitted) when nobody has submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessorAssignmentDto {
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
    pub professor_name: String,
    pub submissions: Vec<SubmissionDto>,
}

#[derive(Debug, Serialize)]
pub struct ProfessorAssignmentsResponseDto {
    pub status: String,
    pub data: Vec<ProfessorAssignmentDto>,
}

// ============================================================================
// Grading DTOs
// ============================================================================

/// Grading request. `feedback` drives a three-way branch: empty text deletes
/// any existing feedback row, non-empty text overwrites or inserts one.
#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct GradeSubmissionDto {
    #[validate(custom(function = "validate_grade_status"))]
    pub new_status: SubmissionStatus,

    pub feedback: String,
}

fn validate_grade_status(status: &SubmissionStatus) -> Result<(), ValidationError> {
    match status {
        SubmissionStatus::Passed | SubmissionStatus::Failed => Ok(()),
        SubmissionStatus::Submitted => Err(ValidationError::new("invalid_grade")
            .with_message("Status must be passed or failed".into())),
    }
}

/// Grading roster row: every student of the assignment's course, with their
/// submission and feedback left-joined (all None when nothing was handed in)
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssignmentSubmissionRowDto {
    pub student_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub submission_id: Option<Uuid>,
    pub submission: Option<String>,
    pub status: Option<SubmissionStatus>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub feedback: Option<String>,
    pub assignment_id: Uuid,
    pub assignment_name: String,
}

#[derive(Debug, Serialize)]
pub struct AssignmentSubmissionsResponseDto {
    pub status: String,
    pub data: Vec<AssignmentSubmissionRowDto>,
}

// ============================================================================
// Student assignment detail DTOs
// ============================================================================

/// Wide single-assignment view for a student: assignment + course +
/// professor, with the student's own submission and feedback left-joined
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssignmentWithSubmissionDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub attachment: Option<String>,
    pub url: Option<String>,
    pub due_date: DateTime<Utc>,
    pub course_id: Uuid,
    pub course_name: String,
    pub professor_id: Uuid,
    pub professor_name: String,
    pub submission: Option<String>,
    pub status: Option<SubmissionStatus>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Returned as an array for interface uniformity; callers treat index 0 as
/// "the" result.
#[derive(Debug, Serialize)]
pub struct AssignmentDetailResponseDto {
    pub status: String,
    pub data: Vec<AssignmentWithSubmissionDto>,
}

// ============================================================================
// Submission DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SubmissionResponseDto {
    pub status: String,
    pub message: String,
    pub data: Submission,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn valid_assignment_dto() -> UpsertAssignmentDto {
        UpsertAssignmentDto {
            name: "Week 3 problem set".to_string(),
            due_date: Utc::now() + Duration::days(7),
            id_course: Uuid::new_v4(),
            id_professor: Uuid::new_v4(),
            ..Default::default()
        }
    }

    #[test]
    fn future_due_date_passes_validation() {
        assert!(valid_assignment_dto().validate().is_ok());
    }

    #[test]
    fn past_due_date_fails_validation() {
        let dto = UpsertAssignmentDto {
            due_date: Utc::now() - Duration::minutes(1),
            ..valid_assignment_dto()
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn default_assignment_dto_fails_validation() {
        // untouched form defaults (nil ids, epoch date) never reach the db
        assert!(UpsertAssignmentDto::default().validate().is_err());
    }

    #[test]
    fn course_without_professors_fails_validation() {
        let dto = UpsertCourseDto {
            name: "CS101".to_string(),
            professors: vec![],
            students: vec![Uuid::new_v4()],
            ..Default::default()
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn course_without_students_is_valid() {
        let dto = UpsertCourseDto {
            name: "CS101".to_string(),
            professors: vec![Uuid::new_v4()],
            students: vec![],
            ..Default::default()
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn grading_with_submitted_status_fails_validation() {
        let dto = GradeSubmissionDto {
            new_status: SubmissionStatus::Submitted,
            feedback: String::new(),
        };
        assert!(dto.validate().is_err());

        let dto = GradeSubmissionDto {
            new_status: SubmissionStatus::Failed,
            feedback: "see comments".to_string(),
        };
        assert!(dto.validate().is_ok());
    }
}
