use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role domain shared by every account variant.
///
/// Stored in the database as the PostgreSQL ENUM type "roles". Professors and
/// students live in separate tables; each row carries its own literal role
/// value (there is no shared users table).
///
/// The `#[sqlx(type_name = "roles", rename_all = "lowercase")]` attribute:
/// - Maps to the "roles" ENUM in PostgreSQL
/// - Converts variants to lowercase in the database (Professor -> "professor")
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "roles", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Superadmin,
    Manager,
    Professor,
    Student,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Superadmin => "superadmin",
            UserRole::Manager => "manager",
            UserRole::Professor => "professor",
            UserRole::Student => "student",
        }
    }
}

/// Grading state of a submission, mapped to the PostgreSQL ENUM
/// "assignment_status". New rows default to `Submitted`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "assignment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Submitted,
    Passed,
    Failed,
}

/// Professor model representing the professors table.
///
/// `password` stores an argon2 hash, never plain text.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Professor {
    pub id: Uuid,
    pub username: String,
    pub password: String,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Student model representing the students table.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Student {
    pub id: Uuid,
    pub username: String,
    pub password: String,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Common projection of the two account tables.
///
/// Login and the auth middleware resolve accounts through a UNION ALL of
/// professors and students; this struct is the shape of that combined row.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct UserAccount {
    pub id: Uuid,
    pub username: String,
    pub password: String,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Course model representing the courses table.
///
/// Membership lives in the two mapping tables, not here.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Assignment model representing the assignments table.
///
/// Belongs to exactly one course and one authoring professor. `attachment`
/// holds a public object-store URL when present.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Assignment {
    pub id: Uuid,
    pub url: Option<String>,
    pub name: String,
    pub due_date: DateTime<Utc>,
    pub attachment: Option<String>,
    pub description: Option<String>,
    pub id_course: Uuid,
    pub id_professor: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Submission model representing the assignments_submissions table.
///
/// `submission` is the stored file URL and is never null: a URL-less
/// "intent to submit" cannot exist. At most one row per
/// (id_assignment, id_student), backed by a unique index.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Submission {
    pub id: Uuid,
    pub status: SubmissionStatus,
    pub submission: String,
    pub id_assignment: Uuid,
    pub id_student: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Feedback model representing the feedback table.
///
/// One note per submission by intent. A feedback row only exists while its
/// text is non-empty; grading with empty text deletes it.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Feedback {
    pub id: Uuid,
    pub description: String,
    pub id_assignment_submission: Uuid,
}
