use axum::Extension;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{Router, middleware};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::db::{AssignmentExt, SubmissionExt};
use crate::dtos::{
    AssignmentDetailResponseDto, AssignmentResponseDto, AssignmentSubmissionsResponseDto,
    ProfessorAssignmentsResponseDto, StudentAssignmentsResponseDto, SubmissionResponseDto,
    UpsertAssignmentDto,
};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{JWTAuthMiddleware, auth, role_check};
use crate::models::UserRole;
use crate::utils::upload::{MAX_ATTACHMENT_BYTES, has_allowed_extension};
use tracing::instrument;

/// Folder (inside the storage bucket) for assignment attachments
const ATTACHMENTS_FOLDER: &str = "attachments";
/// Folder (inside the storage bucket) for student submissions
const SUBMISSIONS_FOLDER: &str = "submissions";

pub fn assignments_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(upsert_assignment)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Professor])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{assignment_id}/submissions",
            get(get_assignment_submissions)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Professor])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{assignment_id}/submission",
            get(get_assignment_submission)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Student])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{assignment_id}/submit",
            post(submit_assignment)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Student])
                }))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Assignment listing routes nested under /courses/{course_id}/assignments
pub fn course_assignments_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_course_assignments)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Professor])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/student",
            get(get_student_course_assignments)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Student])
                }))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// All assignments of a course with every student submission attached
/// (professor view). Assignments nobody submitted to carry an empty
/// submissions array.
#[instrument(skip(app_state))]
pub async fn get_course_assignments(
    Path(course_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let assignments = app_state
        .db_client
        .get_assignments_by_course(course_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting course assignments: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = Json(ProfessorAssignmentsResponseDto {
        status: "success".to_string(),
        data: assignments,
    });
    Ok(response)
}

/// A student's assignments for one course, partitioned into due and past.
/// An assignment the student already submitted is always past, regardless of
/// its due date.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn get_student_course_assignments(
    Path(course_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let data = app_state
        .db_client
        .get_student_assignments_by_course(jwt.user.id, course_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting student assignments: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = Json(StudentAssignmentsResponseDto {
        status: "success".to_string(),
        data,
    });
    Ok(response)
}

fn none_if_empty(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

fn apply_assignment_field(
    form: &mut UpsertAssignmentDto,
    name: &str,
    value: String,
) -> Result<(), HttpError> {
    match name {
        "id" => {
            form.id = Some(
                Uuid::parse_str(&value)
                    .map_err(|_| HttpError::bad_request("Invalid assignment id"))?,
            );
        }
        "name" => form.name = value,
        "url" => form.url = none_if_empty(value),
        "due_date" => {
            form.due_date = DateTime::parse_from_rfc3339(&value)
                .map_err(|_| HttpError::bad_request("Invalid due date"))?
                .with_timezone(&Utc);
        }
        "description" => form.description = none_if_empty(value),
        "notes" => form.notes = none_if_empty(value),
        "id_course" => {
            form.id_course = Uuid::parse_str(&value)
                .map_err(|_| HttpError::bad_request("Invalid course id"))?;
        }
        // the current attachment URL, resent by the edit form when the
        // file input is left untouched
        "attachment" => form.attachment = none_if_empty(value),
        _ => {}
    }
    Ok(())
}

/// Create or update an assignment (multipart form).
///
/// Text fields populate the DTO on top of its explicit defaults; an optional
/// "attachment" file part is uploaded to the object store after validation
/// passes, replacing (and deleting) any previously stored attachment. A past
/// due date fails validation before anything is written or uploaded.
#[instrument(skip(app_state, jwt, multipart), fields(username = %jwt.user.username))]
pub async fn upsert_assignment(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let mut form = UpsertAssignmentDto::default();
    let mut attachment_file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "attachment" && field.file_name().is_some() {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| HttpError::bad_request(e.to_string()))?;
            if !bytes.is_empty() {
                attachment_file = Some((filename, bytes.to_vec()));
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| HttpError::bad_request(e.to_string()))?;
            apply_assignment_field(&mut form, &name, value)?;
        }
    }

    // the author is always the authenticated professor
    form.id_professor = jwt.user.id;

    if let Some((filename, bytes)) = &attachment_file {
        if bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(HttpError::bad_request("Please upload a file under 5 MB"));
        }
        if !has_allowed_extension(filename) {
            return Err(HttpError::bad_request("Unsupported file format."));
        }
    }

    // validate before any storage or database effect
    form.validate().map_err(|e| {
        tracing::error!("Invalid upsert_assignment input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let is_update = form.id.is_some();

    if let Some((filename, bytes)) = attachment_file {
        // a new file supersedes whatever the stored row points at; the row,
        // not the client, is authoritative for the old URL
        if let Some(assignment_id) = form.id {
            let prior = app_state
                .db_client
                .get_assignment(assignment_id)
                .await
                .map_err(|e| {
                    tracing::error!("DB error, getting assignment: {}", e);
                    HttpError::server_error(ErrorMessage::ServerError.to_string())
                })?;

            if let Some(old_url) = prior.and_then(|a| a.attachment) {
                app_state.storage_client.delete(&old_url).await?;
            }
        }

        let url = app_state
            .storage_client
            .upload(
                bytes,
                &filename,
                &app_state.env.storage_bucket,
                Some(ATTACHMENTS_FOLDER),
            )
            .await?;
        form.attachment = Some(url);
    }

    let saved = app_state
        .db_client
        .upsert_assignment(&form)
        .await
        .map_err(|e| {
            if let sqlx::Error::RowNotFound = e {
                tracing::error!("Assignment not found for update");
                return HttpError::not_found("Assignment not found");
            }
            tracing::error!("DB error, upserting assignment: {}", e);
            if is_update {
                HttpError::server_error("An error occurred while updating the assignment.")
            } else {
                HttpError::server_error("An error occurred while creating the assignment.")
            }
        })?;

    let (status_code, message) = if is_update {
        (StatusCode::OK, "Assignment updated successfully.")
    } else {
        (StatusCode::CREATED, "Assignment created successfully.")
    };

    let response = Json(AssignmentResponseDto {
        status: "success".to_string(),
        message: message.to_string(),
        data: saved,
    });
    tracing::info!("upsert_assignment successful");
    Ok((status_code, response))
}

/// Grading roster for an assignment: every student of its course with their
/// submission and feedback left-joined
#[instrument(skip(app_state))]
pub async fn get_assignment_submissions(
    Path(assignment_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let rows = app_state
        .db_client
        .get_assignment_submissions(assignment_id)
        .await
        .map_err(|e| {
            if let sqlx::Error::RowNotFound = e {
                tracing::error!("Assignment not found: {}", assignment_id);
                return HttpError::not_found("Assignment not found");
            }
            tracing::error!("DB error, getting assignment submissions: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = Json(AssignmentSubmissionsResponseDto {
        status: "success".to_string(),
        data: rows,
    });
    Ok(response)
}

/// A student's single-assignment view with their own submission and feedback.
/// The data is an array for interface uniformity; index 0 is the result.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn get_assignment_submission(
    Path(assignment_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let rows = app_state
        .db_client
        .get_assignment_with_submission_by_student(jwt.user.id, assignment_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting assignment with submission: {}", e);
            HttpError::server_error("Error retrieving assignments with submissions.")
        })?;

    if rows.is_empty() {
        return Err(HttpError::not_found("Assignment not found"));
    }

    let response = Json(AssignmentDetailResponseDto {
        status: "success".to_string(),
        data: rows,
    });
    Ok(response)
}

/// Submit (or resubmit) a file for an assignment.
///
/// Submission is idempotent by presence: if a row already exists for
/// (assignment, student), the freshly uploaded file replaces the stored one
/// (the old object is deleted) and the same row is updated; otherwise a new
/// row is inserted with status 'submitted'. The parent assignment is not
/// re-checked here - the client flow guarantees it exists.
#[instrument(skip(app_state, jwt, multipart), fields(username = %jwt.user.username))]
pub async fn submit_assignment(
    Path(assignment_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| HttpError::bad_request(e.to_string()))?;
            upload = Some((filename, bytes.to_vec()));
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| HttpError::bad_request("A submission file is required."))?;

    if bytes.len() > MAX_ATTACHMENT_BYTES {
        return Err(HttpError::bad_request("Please upload a file under 5 MB"));
    }
    if !has_allowed_extension(&filename) {
        return Err(HttpError::bad_request("Unsupported file format."));
    }

    let student_id = jwt.user.id;

    let existing = app_state
        .db_client
        .check_submission(assignment_id, student_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking submission: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    // upload first; the old object is only removed once the new one is in
    let file_url = app_state
        .storage_client
        .upload(
            bytes,
            &filename,
            &app_state.env.storage_bucket,
            Some(SUBMISSIONS_FOLDER),
        )
        .await?;

    let (status_code, submission) = match existing {
        Some(prior) => {
            app_state.storage_client.delete(&prior.submission).await?;

            let updated = app_state
                .db_client
                .update_submission_file(assignment_id, student_id, &file_url)
                .await
                .map_err(|e| {
                    tracing::error!("DB error, updating submission: {}", e);
                    HttpError::server_error("Failed to submit assignment. Please try again.")
                })?;
            (StatusCode::OK, updated)
        }
        None => {
            let created = app_state
                .db_client
                .create_submission(assignment_id, student_id, &file_url)
                .await
                .map_err(|e| {
                    tracing::error!("DB error, creating submission: {}", e);
                    HttpError::server_error("Failed to submit assignment. Please try again.")
                })?;
            (StatusCode::CREATED, created)
        }
    };

    let response = Json(SubmissionResponseDto {
        status: "success".to_string(),
        message: "Successfully submitted.".to_string(),
        data: submission,
    });
    tracing::info!("submit_assignment successful");
    Ok((status_code, response))
}
