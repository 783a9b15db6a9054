use std::collections::HashMap;

use super::DBClient;
use crate::dtos::{CourseWithStudentsDto, EnrolledStudentDto, UpsertCourseDto};
use crate::models::{Course, Professor, UserRole};
use uuid::Uuid;

/// Course aggregation and mutation operations
pub trait CourseExt {
    /// Courses a student is enrolled in
    async fn get_courses_by_student(&self, student_id: Uuid) -> Result<Vec<Course>, sqlx::Error>;

    /// Courses a professor teaches, each with its full student roster.
    /// One entry per distinct course; courses with no enrolled students get
    /// an empty roster, not a missing one.
    async fn get_available_courses_by_professor(
        &self,
        professor_id: Uuid,
    ) -> Result<Vec<CourseWithStudentsDto>, sqlx::Error>;

    /// Create or update a course together with its membership mappings.
    /// On update the existing professor and student mappings are deleted and
    /// reinserted from the submitted lists (full replace, not a diff). Runs
    /// in a single transaction. Returns the course id.
    async fn upsert_course(&self, course: &UpsertCourseDto) -> Result<Uuid, sqlx::Error>;

    /// Professors mapped to a course
    async fn get_professors_in_course(
        &self,
        course_id: Uuid,
    ) -> Result<Vec<Professor>, sqlx::Error>;
}

/// Flat join row produced by the professor roster query: one row per
/// (course, enrolled student), student columns all NULL for a course with
/// no students.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CourseRosterRow {
    pub course_id: Uuid,
    pub course_name: String,
    pub professor_id: Uuid,
    pub professor_first_name: String,
    pub professor_last_name: String,
    pub professor_role: UserRole,
    pub student_id: Option<Uuid>,
    pub student_first_name: Option<String>,
    pub student_last_name: Option<String>,
    pub student_role: Option<UserRole>,
    pub student_email: Option<String>,
}

/// Group flat roster rows by course id, preserving first-appearance order.
pub fn group_courses(rows: Vec<CourseRosterRow>) -> Vec<CourseWithStudentsDto> {
    let mut grouped: Vec<CourseWithStudentsDto> = Vec::new();
    let mut index_by_course: HashMap<Uuid, usize> = HashMap::new();

    for row in rows {
        let i = match index_by_course.get(&row.course_id) {
            Some(i) => *i,
            None => {
                grouped.push(CourseWithStudentsDto {
                    course_id: row.course_id,
                    course_name: row.course_name.clone(),
                    professor_id: row.professor_id,
                    professor_first_name: row.professor_first_name.clone(),
                    professor_last_name: row.professor_last_name.clone(),
                    professor_role: row.professor_role.to_str().to_string(),
                    students: Vec::new(),
                });
                index_by_course.insert(row.course_id, grouped.len() - 1);
                grouped.len() - 1
            }
        };

        if let Some(student_id) = row.student_id {
            grouped[i].students.push(EnrolledStudentDto {
                student_id,
                first_name: row.student_first_name.unwrap_or_default(),
                last_name: row.student_last_name.unwrap_or_default(),
                role: row
                    .student_role
                    .map(|r| r.to_str().to_string())
                    .unwrap_or_default(),
                email: row.student_email.unwrap_or_default(),
            });
        }
    }

    grouped
}

impl CourseExt for DBClient {
    async fn get_courses_by_student(&self, student_id: Uuid) -> Result<Vec<Course>, sqlx::Error> {
        let courses = sqlx::query_as::<_, Course>(
            "SELECT c.id, c.name, c.created_at, c.updated_at
             FROM courses c
             INNER JOIN map_courses_students mcs ON c.id = mcs.id_course
             WHERE mcs.id_student = $1",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(courses)
    }

    async fn get_available_courses_by_professor(
        &self,
        professor_id: Uuid,
    ) -> Result<Vec<CourseWithStudentsDto>, sqlx::Error> {
        let rows = sqlx::query_as::<_, CourseRosterRow>(
            "SELECT c.id AS course_id, c.name AS course_name,
                    p.id AS professor_id,
                    p.first_name AS professor_first_name,
                    p.last_name AS professor_last_name,
                    p.role AS professor_role,
                    s.id AS student_id,
                    s.first_name AS student_first_name,
                    s.last_name AS student_last_name,
                    s.role AS student_role,
                    s.email AS student_email
             FROM courses c
             INNER JOIN map_courses_professors mcp ON c.id = mcp.course_id
             INNER JOIN professors p ON mcp.professor_id = p.id
             LEFT JOIN map_courses_students mcs ON c.id = mcs.id_course
             LEFT JOIN students s ON mcs.id_student = s.id
             WHERE p.id = $1",
        )
        .bind(professor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(group_courses(rows))
    }

    async fn upsert_course(&self, course: &UpsertCourseDto) -> Result<Uuid, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let course_id = match course.id {
            Some(course_id) => {
                let result =
                    sqlx::query("UPDATE courses SET name = $1, updated_at = NOW() WHERE id = $2")
                        .bind(&course.name)
                        .bind(course_id)
                        .execute(&mut *tx)
                        .await?;

                if result.rows_affected() == 0 {
                    return Err(sqlx::Error::RowNotFound);
                }

                // reset professor mappings
                sqlx::query("DELETE FROM map_courses_professors WHERE course_id = $1")
                    .bind(course_id)
                    .execute(&mut *tx)
                    .await?;

                // reset student mappings
                sqlx::query("DELETE FROM map_courses_students WHERE id_course = $1")
                    .bind(course_id)
                    .execute(&mut *tx)
                    .await?;

                course_id
            }
            None => {
                // the course row comes first so the mappings can reference
                // its generated id
                sqlx::query_scalar::<_, Uuid>(
                    "INSERT INTO courses (name) VALUES ($1) RETURNING id",
                )
                .bind(&course.name)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        if !course.professors.is_empty() {
            sqlx::query(
                "INSERT INTO map_courses_professors (professor_id, course_id)
                 SELECT professor_id, $2 FROM UNNEST($1::uuid[]) AS professor_id",
            )
            .bind(&course.professors)
            .bind(course_id)
            .execute(&mut *tx)
            .await?;
        }

        if !course.students.is_empty() {
            sqlx::query(
                "INSERT INTO map_courses_students (id_student, id_course)
                 SELECT id_student, $2 FROM UNNEST($1::uuid[]) AS id_student",
            )
            .bind(&course.students)
            .bind(course_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(course_id)
    }

    async fn get_professors_in_course(
        &self,
        course_id: Uuid,
    ) -> Result<Vec<Professor>, sqlx::Error> {
        let professors = sqlx::query_as::<_, Professor>(
            "SELECT p.id, p.username, p.password, p.role, p.first_name, p.last_name,
                    p.email, p.created_at, p.updated_at
             FROM professors p
             INNER JOIN map_courses_professors mcp ON mcp.professor_id = p.id
             WHERE mcp.course_id = $1",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(professors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_row(
        course_id: Uuid,
        course_name: &str,
        professor_id: Uuid,
        student: Option<(Uuid, &str)>,
    ) -> CourseRosterRow {
        CourseRosterRow {
            course_id,
            course_name: course_name.to_string(),
            professor_id,
            professor_first_name: "Grace".to_string(),
            professor_last_name: "Hopper".to_string(),
            professor_role: UserRole::Professor,
            student_id: student.map(|(id, _)| id),
            student_first_name: student.map(|(_, name)| name.to_string()),
            student_last_name: student.map(|_| "Doe".to_string()),
            student_role: student.map(|_| UserRole::Student),
            student_email: student.map(|_| "student@example.edu".to_string()),
        }
    }

    #[test]
    fn groups_rows_by_course() {
        let course_a = Uuid::new_v4();
        let course_b = Uuid::new_v4();
        let professor = Uuid::new_v4();
        let (s1, s2) = (Uuid::new_v4(), Uuid::new_v4());

        let rows = vec![
            roster_row(course_a, "Databases", professor, Some((s1, "Ada"))),
            roster_row(course_a, "Databases", professor, Some((s2, "Linus"))),
            roster_row(course_b, "Compilers", professor, Some((s1, "Ada"))),
        ];

        let grouped = group_courses(rows);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].course_id, course_a);
        assert_eq!(grouped[0].students.len(), 2);
        assert_eq!(grouped[1].course_id, course_b);
        assert_eq!(grouped[1].students.len(), 1);
    }

    #[test]
    fn course_without_students_keeps_empty_roster() {
        let course = Uuid::new_v4();
        let rows = vec![roster_row(course, "Seminar", Uuid::new_v4(), None)];

        let grouped = group_courses(rows);
        assert_eq!(grouped.len(), 1);
        assert!(grouped[0].students.is_empty());
    }

    #[test]
    fn first_appearance_order_is_preserved() {
        let professor = Uuid::new_v4();
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let rows: Vec<CourseRosterRow> = ids
            .iter()
            .map(|id| roster_row(*id, "Course", professor, None))
            .collect();

        let grouped = group_courses(rows);
        let out: Vec<Uuid> = grouped.iter().map(|c| c.course_id).collect();
        assert_eq!(out, ids);
    }
}
